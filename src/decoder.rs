//! FFmpeg-backed [`FrameSource`].
//!
//! Seeking to the end of a stream is done the way a media element clamps an
//! out-of-range seek: jump to the keyframe at or before the target, decode
//! forward to end of stream, and keep whichever frame came out last. The
//! landed position therefore reflects the real last frame rather than the
//! nominal duration.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    conversion::{
        duration_to_seek_timestamp, frame_to_rgb_buffer, pts_to_seconds, seconds_to_duration,
    },
    error::ExtractionError,
    progress::CancellationToken,
    source::{FrameSource, SourceOpener, StreamMetadata},
};

/// Opens videos with FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl SourceOpener for FfmpegOpener {
    type Source = FfmpegSource;

    fn open(&self, path: &Path) -> Result<FfmpegSource, ExtractionError> {
        ffmpeg_next::init().map_err(|error| {
            ExtractionError::LoadFailed(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| {
            ExtractionError::LoadFailed(format!("could not open {}: {error}", path.display()))
        })?;

        log::debug!(
            "Opened {} (format={})",
            path.display(),
            input.format().name()
        );

        Ok(FfmpegSource {
            input,
            path: path.to_path_buf(),
            stream: None,
            current: None,
        })
    }
}

/// The decoder state for the best video stream, created once metadata is read.
struct VideoStream {
    index: usize,
    time_base: Rational,
    decoder: VideoDecoder,
}

/// An open video being driven by FFmpeg.
pub struct FfmpegSource {
    input: Input,
    path: PathBuf,
    stream: Option<VideoStream>,
    current: Option<VideoFrame>,
}

impl Debug for FfmpegSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegSource")
            .field("path", &self.path)
            .field("stream_index", &self.stream.as_ref().map(|stream| stream.index))
            .field("has_frame", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&mut self) -> Result<StreamMetadata, ExtractionError> {
        let stream = self
            .input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| ExtractionError::LoadFailed("no video stream found".to_string()))?;

        let index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                ExtractionError::LoadFailed(format!(
                    "could not create a decoder for stream {index}: {error}"
                ))
            })?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(ExtractionError::LoadFailed(
                "video stream reports no pixel dimensions".to_string(),
            ));
        }

        // Container duration is in AV_TIME_BASE; fall back to the stream's own.
        let container_duration = self.input.duration();
        let duration = if container_duration > 0 {
            Duration::from_micros(container_duration as u64)
        } else {
            seconds_to_duration(pts_to_seconds(stream.duration(), time_base))
        };

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        log::debug!(
            "Video stream {index}: {width}x{height}, {frames_per_second:.2} fps, codec={codec}, duration={:.3}s",
            duration.as_secs_f64()
        );

        self.stream = Some(VideoStream {
            index,
            time_base,
            decoder,
        });

        Ok(StreamMetadata {
            duration,
            width,
            height,
            codec,
            frames_per_second,
        })
    }

    fn seek(
        &mut self,
        target: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Duration, ExtractionError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            ExtractionError::LoadFailed("seek requested before metadata was read".to_string())
        })?;

        let timestamp = duration_to_seek_timestamp(target);
        if timestamp > 0 {
            // Unseekable inputs are decoded from the start instead.
            if let Err(error) = self.input.seek(timestamp, ..timestamp) {
                log::warn!(
                    "Seek to {:.3}s failed in {}, decoding from the start: {error}",
                    target.as_secs_f64(),
                    self.path.display()
                );
            }
        }

        let mut decoded = VideoFrame::empty();
        let mut last: Option<VideoFrame> = None;
        let mut last_error: Option<ffmpeg_next::Error> = None;

        for (packet_stream, packet) in self.input.packets() {
            if cancellation.is_cancelled() {
                log::debug!("Decode of {} cancelled mid-seek", self.path.display());
                return Err(ExtractionError::Cancelled);
            }
            if packet_stream.index() != stream.index {
                continue;
            }
            if let Err(error) = stream.decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet: {error}");
                last_error = Some(error);
                continue;
            }
            while stream.decoder.receive_frame(&mut decoded).is_ok() {
                last = Some(std::mem::replace(&mut decoded, VideoFrame::empty()));
            }
        }

        if let Err(error) = stream.decoder.send_eof() {
            last_error = Some(error);
        }
        while stream.decoder.receive_frame(&mut decoded).is_ok() {
            last = Some(std::mem::replace(&mut decoded, VideoFrame::empty()));
        }

        let frame = last.ok_or_else(|| match last_error {
            Some(error) => ExtractionError::LoadFailed(format!(
                "no frame could be decoded at the end of the stream: {error}"
            )),
            None => ExtractionError::LoadFailed(
                "no frame could be decoded at the end of the stream".to_string(),
            ),
        })?;

        let landed = frame
            .timestamp()
            .or_else(|| frame.pts())
            .map(|pts| seconds_to_duration(pts_to_seconds(pts, stream.time_base)))
            .unwrap_or(target);

        self.current = Some(frame);
        Ok(landed)
    }

    fn render(&mut self, surface: &mut RgbImage) -> Result<(), ExtractionError> {
        let frame = self.current.as_ref().ok_or_else(|| {
            ExtractionError::RenderFailed("no frame is available to draw".to_string())
        })?;

        let (width, height) = surface.dimensions();
        let mut scaler = ScalingContext::get(
            frame.format(),
            frame.width(),
            frame.height(),
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| {
            ExtractionError::RenderFailed(format!("pixel converter unavailable: {error}"))
        })?;

        let mut rgb_frame = VideoFrame::empty();
        scaler.run(frame, &mut rgb_frame).map_err(|error| {
            ExtractionError::RenderFailed(format!("pixel conversion failed: {error}"))
        })?;

        let buffer = frame_to_rgb_buffer(&rgb_frame, width, height);
        if buffer.len() != surface.len() {
            return Err(ExtractionError::RenderFailed(format!(
                "converted frame has {} bytes, surface expects {}",
                buffer.len(),
                surface.len()
            )));
        }
        surface.copy_from_slice(&buffer);
        Ok(())
    }
}

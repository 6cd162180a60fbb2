//! Decoder seam used by the extraction pipeline.
//!
//! A [`SourceOpener`] turns a staged path into a [`FrameSource`]. The source
//! answers the three questions the pipeline asks in order: what the stream
//! looks like, where the cursor lands after seeking, and what the frame under
//! the cursor looks like. [`FfmpegOpener`](crate::FfmpegOpener) is the
//! production implementation.

use std::{path::Path, time::Duration};

use image::RgbImage;

use crate::{error::ExtractionError, progress::CancellationToken};

/// Stream properties known once metadata is ready, before any frame is
/// decoded.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamMetadata {
    /// Reported duration of the stream. May be zero when the container does
    /// not advertise one.
    pub duration: Duration,
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Average frame rate, `0.0` when unknown.
    pub frames_per_second: f64,
}

/// An open, decodable video.
///
/// Methods are called in order: [`metadata`](FrameSource::metadata), then
/// [`seek`](FrameSource::seek), then [`render`](FrameSource::render).
/// Dropping the source releases every decoder resource it holds.
pub trait FrameSource {
    /// Wait for stream metadata.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::LoadFailed`] when the stream is unusable.
    fn metadata(&mut self) -> Result<StreamMetadata, ExtractionError>;

    /// Move the cursor to `target` and return where it landed.
    ///
    /// Targets beyond the last frame land on the last frame, so the returned
    /// position may be earlier than `target`. Decoding towards the target
    /// stops as soon as `cancellation` is set.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::LoadFailed`] when no frame can be decoded.
    /// - [`ExtractionError::Cancelled`] when `cancellation` was set mid-seek.
    fn seek(
        &mut self,
        target: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Duration, ExtractionError>;

    /// Draw the frame under the cursor into `surface`, scaling to the
    /// surface's dimensions if needed.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::RenderFailed`] when the frame cannot be drawn.
    fn render(&mut self, surface: &mut RgbImage) -> Result<(), ExtractionError>;
}

/// Factory for [`FrameSource`]s.
///
/// Sources are opened on the worker thread that uses them, so only the
/// opener has to be shareable.
pub trait SourceOpener: Send + Sync + 'static {
    /// The source type this opener produces.
    type Source: FrameSource;

    /// Open the video at `path`.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::LoadFailed`] for unreadable or unsupported inputs.
    fn open(&self, path: &Path) -> Result<Self::Source, ExtractionError>;
}

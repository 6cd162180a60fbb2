//! The last-frame extraction pipeline.
//!
//! [`extract_last_frame`] runs the whole sequence on the calling thread:
//! stage the input, open it, wait for metadata, seek to the reported
//! duration, render onto a surface at native size, and encode to JPEG.
//! [`spawn_extraction`] runs the same sequence on tokio's blocking pool and
//! hands back an [`ExtractionTask`] future.
//!
//! The staged input and the decoder are owned by the run and dropped on
//! every exit path, including cancellation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lastframe::{ExtractOptions, ExtractionError, FfmpegOpener, VideoInput};
//!
//! # async fn example() -> Result<(), ExtractionError> {
//! let input = VideoInput::from_path("myclip.mp4");
//! let frame = lastframe::spawn_extraction(Arc::new(FfmpegOpener), input, ExtractOptions::new())
//!     .await?;
//! std::fs::write(frame.file_name(), frame.bytes()).unwrap();
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tokio::task::JoinHandle;

use crate::{
    configuration::ExtractOptions,
    error::ExtractionError,
    frame::{ExtractedFrame, allocate_surface, encode_jpeg},
    input::VideoInput,
    progress::{CancellationToken, PipelineStage},
    source::{FrameSource, SourceOpener, StreamMetadata},
    staging::StagedInput,
};

/// Extract the last frame of `input`, blocking the current thread.
///
/// # Errors
///
/// - [`ExtractionError::LoadFailed`] if the video cannot be staged, opened,
///   or decoded.
/// - [`ExtractionError::RenderFailed`] if the surface cannot be drawn or
///   encoded.
/// - [`ExtractionError::Cancelled`] if the options' token was cancelled.
pub fn extract_last_frame<O: SourceOpener>(
    opener: &O,
    input: &VideoInput,
    options: &ExtractOptions,
) -> Result<ExtractedFrame, ExtractionError> {
    let (staged, mut source, metadata) = open_and_read_metadata(opener, input, options)?;

    checkpoint(options, PipelineStage::Seeking)?;
    let cancellation = options.cancellation.clone().unwrap_or_default();
    let position = source.seek(metadata.duration, &cancellation)?;
    log::debug!(
        "Seek to {:.3}s landed at {:.3}s",
        metadata.duration.as_secs_f64(),
        position.as_secs_f64()
    );

    checkpoint(options, PipelineStage::Rendering)?;
    let mut surface = allocate_surface(metadata.width, metadata.height)?;
    source.render(&mut surface)?;

    // Nothing below needs the decoder.
    drop(source);
    drop(staged);

    checkpoint(options, PipelineStage::Encoding)?;
    let jpeg = encode_jpeg(&surface, options.quality)?;

    log::info!(
        "Extracted last frame of {} ({}x{}, {} bytes)",
        input.name(),
        metadata.width,
        metadata.height,
        jpeg.len()
    );

    Ok(ExtractedFrame {
        jpeg: jpeg.into(),
        file_name: input.suggested_file_name(),
        width: metadata.width,
        height: metadata.height,
        position,
        duration: metadata.duration,
    })
}

/// Read stream metadata for `input` without decoding any frame.
///
/// # Errors
///
/// Same load errors as [`extract_last_frame`].
pub fn probe<O: SourceOpener>(
    opener: &O,
    input: &VideoInput,
    options: &ExtractOptions,
) -> Result<StreamMetadata, ExtractionError> {
    open_and_read_metadata(opener, input, options).map(|(_, _, metadata)| metadata)
}

fn open_and_read_metadata<O: SourceOpener>(
    opener: &O,
    input: &VideoInput,
    options: &ExtractOptions,
) -> Result<(StagedInput, O::Source, StreamMetadata), ExtractionError> {
    checkpoint(options, PipelineStage::Staging)?;
    let staged = StagedInput::stage(input)?;

    checkpoint(options, PipelineStage::Opening)?;
    let mut source = opener.open(staged.path())?;

    checkpoint(options, PipelineStage::AwaitingMetadata)?;
    let metadata = source.metadata()?;

    Ok((staged, source, metadata))
}

fn checkpoint(options: &ExtractOptions, stage: PipelineStage) -> Result<(), ExtractionError> {
    if options.is_cancelled() {
        log::debug!("Run cancelled before {stage}");
        return Err(ExtractionError::Cancelled);
    }
    options.enter(stage);
    Ok(())
}

/// An extraction running on tokio's blocking pool.
///
/// Resolves to the run's result. Dropping the task before it resolves
/// cancels the run; the worker then releases the decoder and staged input at
/// its next stage boundary.
///
/// Must be created inside a tokio runtime.
#[must_use = "dropping an ExtractionTask cancels the extraction"]
pub struct ExtractionTask {
    handle: JoinHandle<Result<ExtractedFrame, ExtractionError>>,
    cancellation: CancellationToken,
}

impl ExtractionTask {
    /// The token that cancels this run.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel the run.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Future for ExtractionTask {
    type Output = Result<ExtractedFrame, ExtractionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|result| {
            result.unwrap_or_else(|error| {
                if error.is_panic() {
                    Err(ExtractionError::LoadFailed(
                        "the decoder stopped unexpectedly".to_string(),
                    ))
                } else {
                    Err(ExtractionError::Cancelled)
                }
            })
        })
    }
}

impl Drop for ExtractionTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            self.cancellation.cancel();
        }
    }
}

/// Start [`extract_last_frame`] on the blocking pool.
///
/// Uses the cancellation token from `options` when one is set, otherwise
/// creates one.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_extraction<O: SourceOpener>(
    opener: Arc<O>,
    input: VideoInput,
    options: ExtractOptions,
) -> ExtractionTask {
    let cancellation = options.cancellation.clone().unwrap_or_default();
    let options = options.with_cancellation(cancellation.clone());

    let handle = tokio::task::spawn_blocking(move || {
        extract_last_frame(opener.as_ref(), &input, &options)
    });

    ExtractionTask {
        handle,
        cancellation,
    }
}

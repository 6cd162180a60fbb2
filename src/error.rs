//! Error types for the `lastframe` crate.
//!
//! Two error families exist. [`ExtractionError`] is what a pipeline run
//! settles with when it does not produce a frame; its surfaced variants map
//! onto an [`ErrorKind`] that the view layer shows to the user.
//! [`ControllerError`] covers intents the
//! [`ViewController`](crate::ViewController) refuses to act on.

use std::{fmt, io::Error as IoError};

use thiserror::Error;

use crate::{controller::ExtractionStatus, input::VideoInput};

/// Why a pipeline run failed to produce a frame.
///
/// `LoadFailed` and `RenderFailed` are terminal for the run and are shown to
/// the user verbatim. `Cancelled` only ever reaches runs that were
/// superseded or abandoned, whose outcome is discarded anyway.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    /// The input could not be read, demuxed, or decoded.
    #[error("Failed to load video: {0}")]
    LoadFailed(String),

    /// The off-screen surface could not be allocated, drawn, or encoded.
    #[error("Failed to render last frame: {0}")]
    RenderFailed(String),

    /// The run was cancelled through its [`CancellationToken`](crate::CancellationToken).
    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// The user-facing classification of this error.
    ///
    /// Returns `None` for [`ExtractionError::Cancelled`], which is never
    /// presented.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExtractionError::LoadFailed(_) => Some(ErrorKind::LoadFailed),
            ExtractionError::RenderFailed(_) => Some(ErrorKind::RenderFailed),
            ExtractionError::Cancelled => None,
        }
    }
}

/// Classification of a failed run, as shown on the error view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unreadable, corrupt, or unsupported video.
    LoadFailed,
    /// Drawing surface unavailable or the frame could not be encoded.
    RenderFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LoadFailed => f.write_str("load failed"),
            ErrorKind::RenderFailed => f.write_str("render failed"),
        }
    }
}

/// An intent the controller refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    /// The selected file is not a video and never reached the pipeline.
    #[error("{name} is not a video file (type: {mime})")]
    NotAVideo {
        /// Display name of the rejected input.
        name: String,
        /// The MIME type it was detected as.
        mime: String,
    },

    /// The intent is not valid in the current status.
    #[error("Cannot {intent} while {status}")]
    InvalidIntent {
        /// Name of the rejected intent (e.g. `"download"`).
        intent: &'static str,
        /// Status at the time of the request.
        status: ExtractionStatus,
    },

    /// The download sink failed to store the frame.
    #[error("Failed to deliver frame: {0}")]
    Delivery(#[from] IoError),
}

impl ControllerError {
    /// Rejection of `input` because it is not a video.
    pub fn not_a_video(input: &VideoInput) -> Self {
        ControllerError::NotAVideo {
            name: input.name().to_string(),
            mime: input.mime().unwrap_or("unknown").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_video_names_the_detected_type() {
        let error = ControllerError::not_a_video(&VideoInput::from_bytes("notes.txt", Vec::new()));
        assert_eq!(error.to_string(), "notes.txt is not a video file (type: text/plain)");

        let error = ControllerError::not_a_video(&VideoInput::from_bytes("blob", Vec::new()));
        assert_eq!(error.to_string(), "blob is not a video file (type: unknown)");
    }
}

//! # lastframe
//!
//! Grab the last visible frame of a video file and offer it as a JPEG.
//!
//! The crate has two halves:
//!
//! - an **extraction pipeline** that stages the input, waits for stream
//!   metadata, seeks to the end of the timeline, renders the frame under the
//!   cursor onto an off-screen surface at native resolution, and encodes it
//!   at maximum JPEG quality, powered by FFmpeg via the
//!   [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate;
//! - a **view controller**, a small state machine (idle, processing,
//!   success, error) that starts runs, discards stale results, and delivers
//!   the frame as `<name>_last_frame.jpg`.
//!
//! ## Quick Start
//!
//! ### One-shot extraction
//!
//! ```no_run
//! use lastframe::{ExtractOptions, FfmpegOpener, VideoInput};
//!
//! let input = VideoInput::from_path("myclip.mp4");
//! let frame = lastframe::extract_last_frame(&FfmpegOpener, &input, &ExtractOptions::new()).unwrap();
//! assert_eq!(frame.file_name(), "myclip_last_frame.jpg");
//! std::fs::write(frame.file_name(), frame.bytes()).unwrap();
//! ```
//!
//! ### Driving the controller
//!
//! ```no_run
//! use lastframe::{DirectorySink, ExtractionStatus, VideoInput, ViewController};
//!
//! # async fn example() -> Result<(), lastframe::ControllerError> {
//! let mut controller = ViewController::new();
//! let ticket = controller.select_file(VideoInput::from_path("myclip.mp4"))?;
//! controller.settle(ticket.await);
//!
//! if controller.status() == ExtractionStatus::Success {
//!     controller.download(&mut DirectorySink::new("exports"))?;
//! }
//! println!("{}", controller.view());
//! # Ok(())
//! # }
//! ```
//!
//! ## Seek accuracy
//!
//! The seek target is the duration the container reports. The decoder lands
//! on the last frame it can actually produce, which may sit slightly before
//! that; the landed position is available through
//! [`ExtractedFrame::position`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod input;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod staging;

pub use configuration::{ExtractOptions, MAX_JPEG_QUALITY};
pub use controller::{
    DirectorySink, DownloadSink, ErrorDetail, ExtractionStatus, ExtractionTicket, RunId,
    RunOutcome, View, ViewController,
};
pub use decoder::{FfmpegOpener, FfmpegSource};
pub use error::{ControllerError, ErrorKind, ExtractionError};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{ExtractedFrame, MAX_SURFACE_DIMENSION, encode_jpeg};
pub use input::{LAST_FRAME_SUFFIX, VideoInput};
pub use pipeline::{ExtractionTask, extract_last_frame, probe, spawn_extraction};
pub use progress::{CancellationToken, PipelineStage, StageObserver};
pub use source::{FrameSource, SourceOpener, StreamMetadata};
pub use staging::StagedInput;

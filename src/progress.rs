//! Stage reporting and cancellation support.
//!
//! A pipeline run passes through a fixed sequence of [`PipelineStage`]s. A
//! [`StageObserver`] is told about each one as the run enters it, and a
//! [`CancellationToken`] is checked before each one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lastframe::{ExtractOptions, PipelineStage, StageObserver};
//!
//! struct PrintStage;
//!
//! impl StageObserver for PrintStage {
//!     fn on_stage(&self, stage: PipelineStage) {
//!         println!("{stage}");
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_observer(Arc::new(PrintStage));
//! ```

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// The step a pipeline run is currently performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Making the input readable by the decoder.
    Staging,
    /// Opening the container.
    Opening,
    /// Waiting for duration and dimensions.
    AwaitingMetadata,
    /// Seeking to the end of the timeline.
    Seeking,
    /// Drawing the frame onto the off-screen surface.
    Rendering,
    /// Encoding the surface to JPEG.
    Encoding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Staging => "staging input",
            PipelineStage::Opening => "opening video",
            PipelineStage::AwaitingMetadata => "reading metadata",
            PipelineStage::Seeking => "seeking to the end",
            PipelineStage::Rendering => "rendering frame",
            PipelineStage::Encoding => "encoding JPEG",
        };
        f.write_str(label)
    }
}

/// Receives stage transitions during a run.
///
/// Observers run on the extraction worker thread, hence [`Send`] and
/// [`Sync`]. They cannot stop the run; use [`CancellationToken`] for that.
pub trait StageObserver: Send + Sync {
    /// Called when the run enters `stage`.
    fn on_stage(&self, stage: PipelineStage);
}

/// Observer that ignores every stage. Used when none is configured.
pub(crate) struct NoOpObserver;

impl StageObserver for NoOpObserver {
    fn on_stage(&self, _stage: PipelineStage) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. The pipeline checks the token before every stage and
/// stops with [`ExtractionError::Cancelled`](crate::ExtractionError::Cancelled).
///
/// # Example
///
/// ```
/// use lastframe::CancellationToken;
///
/// let token = CancellationToken::new();
/// let shared = token.clone();
/// assert!(!shared.is_cancelled());
///
/// token.cancel();
/// assert!(shared.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that threads the JPEG quality, a
//! cancellation token, and a stage observer through a pipeline run.
//!
//! # Example
//!
//! ```
//! use lastframe::{CancellationToken, ExtractOptions};
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_quality(90)
//!     .with_cancellation(token.clone());
//! assert_eq!(options.quality(), 90);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use crate::progress::{CancellationToken, NoOpObserver, PipelineStage, StageObserver};

/// JPEG quality used unless configured otherwise.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Settings for one extraction run.
///
/// A default-constructed value encodes at maximum quality, never cancels,
/// and reports stages nowhere.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) quality: u8,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) observer: Arc<dyn StageObserver>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("quality", &self.quality)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            quality: MAX_JPEG_QUALITY,
            cancellation: None,
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Set the JPEG quality, clamped to `1..=100`.
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, MAX_JPEG_QUALITY);
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the run stops before its next stage and
    /// returns [`ExtractionError::Cancelled`](crate::ExtractionError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Attach a stage observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configured JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    pub(crate) fn enter(&self, stage: PipelineStage) {
        log::debug!("Pipeline stage: {stage}");
        self.observer.on_stage(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_clamped() {
        assert_eq!(ExtractOptions::new().quality(), 100);
        assert_eq!(ExtractOptions::new().with_quality(0).quality(), 1);
        assert_eq!(ExtractOptions::new().with_quality(255).quality(), 100);
    }

    #[test]
    fn cancellation_is_observed_through_clones() {
        let token = CancellationToken::new();
        let options = ExtractOptions::new().with_cancellation(token.clone());
        assert!(!options.is_cancelled());
        token.cancel();
        assert!(options.is_cancelled());
    }
}

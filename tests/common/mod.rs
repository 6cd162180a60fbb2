//! Synthetic decoder shared by the integration tests.
//!
//! `SyntheticOpener` never reads the file it is given; it reports fixed
//! metadata, paints a gradient, and records what the pipeline asked of it so
//! tests can check ordering and resource release.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use image::{Rgb, RgbImage};
use lastframe::{
    CancellationToken, ExtractionError, FrameSource, PipelineStage, SourceOpener, StageObserver,
    StreamMetadata,
};

/// Where a synthetic source should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Open,
    Metadata,
    Seek,
    Render,
}

/// What the pipeline did with the synthetic sources.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Paths handed to `open`, and whether they existed at that moment.
    pub opened: Arc<Mutex<Vec<(PathBuf, bool)>>>,
    /// Seek targets in call order.
    pub seeks: Arc<Mutex<Vec<Duration>>>,
    /// Number of sources dropped.
    pub released: Arc<AtomicUsize>,
}

impl Record {
    pub fn opened(&self) -> Vec<(PathBuf, bool)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct SyntheticOpener {
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    pub last_frame_at: Option<Duration>,
    pub failure: Option<Failure>,
    pub seek_gate: Option<Arc<Mutex<Receiver<()>>>>,
    pub record: Record,
}

impl SyntheticOpener {
    pub fn new(width: u32, height: u32, duration: Duration) -> Self {
        Self {
            width,
            height,
            duration,
            last_frame_at: None,
            failure: None,
            seek_gate: None,
            record: Record::default(),
        }
    }

    pub fn failing_at(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Report the last decodable frame at `position` instead of the duration.
    pub fn last_frame_at(mut self, position: Duration) -> Self {
        self.last_frame_at = Some(position);
        self
    }

    /// Block every seek until a value is sent on the returned channel or the
    /// run is cancelled.
    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        self.seek_gate = Some(Arc::new(Mutex::new(receiver)));
        (self, sender)
    }
}

impl SourceOpener for SyntheticOpener {
    type Source = SyntheticSource;

    fn open(&self, path: &Path) -> Result<SyntheticSource, ExtractionError> {
        self.record
            .opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));

        if self.failure == Some(Failure::Open) {
            return Err(ExtractionError::LoadFailed(
                "invalid data found when processing input".to_string(),
            ));
        }

        Ok(SyntheticSource {
            width: self.width,
            height: self.height,
            duration: self.duration,
            last_frame_at: self.last_frame_at,
            failure: self.failure,
            seek_gate: self.seek_gate.clone(),
            record: self.record.clone(),
        })
    }
}

pub struct SyntheticSource {
    width: u32,
    height: u32,
    duration: Duration,
    last_frame_at: Option<Duration>,
    failure: Option<Failure>,
    seek_gate: Option<Arc<Mutex<Receiver<()>>>>,
    record: Record,
}

impl FrameSource for SyntheticSource {
    fn metadata(&mut self) -> Result<StreamMetadata, ExtractionError> {
        if self.failure == Some(Failure::Metadata) {
            return Err(ExtractionError::LoadFailed("moov atom not found".to_string()));
        }
        Ok(StreamMetadata {
            duration: self.duration,
            width: self.width,
            height: self.height,
            codec: "synthetic".to_string(),
            frames_per_second: 30.0,
        })
    }

    fn seek(
        &mut self,
        target: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Duration, ExtractionError> {
        self.record.seeks.lock().unwrap().push(target);
        if let Some(gate) = &self.seek_gate {
            loop {
                if cancellation.is_cancelled() {
                    return Err(ExtractionError::Cancelled);
                }
                // Concurrent runs share the gate; lock it per attempt.
                match gate.lock().unwrap().recv_timeout(Duration::from_millis(5)) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
        if self.failure == Some(Failure::Seek) {
            return Err(ExtractionError::LoadFailed("truncated packet".to_string()));
        }
        Ok(self.last_frame_at.map_or(target, |last| last.min(target)))
    }

    fn render(&mut self, surface: &mut RgbImage) -> Result<(), ExtractionError> {
        if self.failure == Some(Failure::Render) {
            return Err(ExtractionError::RenderFailed("context lost".to_string()));
        }
        for (x, y, pixel) in surface.enumerate_pixels_mut() {
            *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, 128]);
        }
        Ok(())
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.record.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Collects stages in the order they were entered.
#[derive(Default)]
pub struct RecordingObserver {
    pub stages: Mutex<Vec<PipelineStage>>,
}

impl StageObserver for RecordingObserver {
    fn on_stage(&self, stage: PipelineStage) {
        self.stages.lock().unwrap().push(stage);
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

//! Status-driven view controller.
//!
//! [`ViewController`] owns the [`ExtractionStatus`] and everything tied to
//! it: the run in flight, the exported frame, the error detail, and the
//! warning shown on the upload view. It exposes the user intents (select a
//! file, download, reset) and the pipeline's completion points, and renders
//! exactly one [`View`] per status.
//!
//! ```text
//! Idle --select_file--> Processing --success--> Success --reset--> Idle
//!                       Processing --failure--> Error   --reset--> Idle
//! ```
//!
//! Each run is tagged with a [`RunId`]. A completion is honored only if it
//! comes from the current run; selecting a new file while processing
//! supersedes the current run and its late outcome is discarded.
//!
//! # Example
//!
//! ```no_run
//! use lastframe::{DirectorySink, VideoInput, ViewController};
//!
//! # async fn example() -> Result<(), lastframe::ControllerError> {
//! let mut controller = ViewController::new();
//! let ticket = controller.select_file(VideoInput::from_path("myclip.mp4"))?;
//! let outcome = ticket.await;
//! controller.settle(outcome);
//! println!("{}", controller.view());
//!
//! controller.download(&mut DirectorySink::new("."))?;
//! controller.reset()?;
//! # Ok(())
//! # }
//! ```

use std::{
    fmt,
    fs::{self, OpenOptions},
    future::Future,
    io::{Error as IoError, ErrorKind as IoErrorKind, Write},
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use crate::{
    configuration::ExtractOptions,
    decoder::FfmpegOpener,
    error::{ControllerError, ErrorKind, ExtractionError},
    frame::ExtractedFrame,
    input::VideoInput,
    pipeline::{ExtractionTask, spawn_extraction},
    progress::CancellationToken,
    source::SourceOpener,
};

/// Which view is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStatus {
    /// Waiting for a file.
    Idle,
    /// A run is in flight.
    Processing,
    /// A frame is ready to download.
    Success,
    /// The last run failed.
    Error,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStatus::Idle => "idle",
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Success => "showing a result",
            ExtractionStatus::Error => "showing an error",
        };
        f.write_str(name)
    }
}

/// Identity of one extraction run. Later runs compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Diagnostic shown on the error view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    kind: ErrorKind,
    message: String,
}

impl ErrorDetail {
    /// Create a detail of `kind` with a human-readable `message`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message, shown verbatim.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&ExtractionError> for ErrorDetail {
    fn from(error: &ExtractionError) -> Self {
        // A cancelled run that is still current never produced a frame.
        Self::new(
            error.kind().unwrap_or(ErrorKind::LoadFailed),
            error.to_string(),
        )
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// How a run ended, tagged with the run it belongs to.
#[derive(Debug)]
pub struct RunOutcome {
    /// The run that produced this result.
    pub run: RunId,
    /// What the pipeline settled with.
    pub result: Result<ExtractedFrame, ExtractionError>,
}

/// A started run. Await it for the [`RunOutcome`], then hand that to
/// [`ViewController::settle`].
///
/// Dropping the ticket cancels the run.
#[must_use = "dropping an ExtractionTicket cancels the run"]
pub struct ExtractionTicket {
    run: RunId,
    task: ExtractionTask,
}

impl ExtractionTicket {
    /// The run this ticket tracks.
    pub fn run(&self) -> RunId {
        self.run
    }

    /// The token that cancels this run. Set once the run is superseded,
    /// reset away, or dropped.
    pub fn cancellation(&self) -> &CancellationToken {
        self.task.cancellation()
    }
}

impl Future for ExtractionTicket {
    type Output = RunOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let run = self.run;
        Pin::new(&mut self.task)
            .poll(cx)
            .map(|result| RunOutcome { run, result })
    }
}

/// Receives the exported frame on download.
pub trait DownloadSink {
    /// Store `bytes` under `file_name`.
    ///
    /// # Errors
    ///
    /// Any I/O failure while storing.
    fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), IoError>;
}

/// Saves downloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
    overwrite: bool,
}

impl DirectorySink {
    /// Save into `directory`, refusing to replace existing files.
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            overwrite: false,
        }
    }

    /// Allow replacing existing files.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Where a download named `file_name` ends up.
    pub fn target(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), IoError> {
        let path = self.target(file_name);
        if self.overwrite {
            return fs::write(&path, bytes);
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|error| match error.kind() {
                IoErrorKind::AlreadyExists => IoError::new(
                    IoErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ),
                _ => error,
            })?;
        file.write_all(bytes)
    }
}

/// What the user currently sees.
#[derive(Debug, Clone, Copy)]
pub enum View<'a> {
    /// Upload zone, optionally with a warning about a rejected file.
    Upload {
        /// Warning from the last rejected selection.
        warning: Option<&'a str>,
    },
    /// Progress indicator for the file being processed.
    Processing {
        /// Display name of the input.
        file_name: &'a str,
    },
    /// The extracted frame with download and reset actions.
    Result {
        /// The frame on offer.
        frame: &'a ExtractedFrame,
    },
    /// The failure message with a reset action.
    Error {
        /// What went wrong.
        detail: &'a ErrorDetail,
    },
}

impl View<'_> {
    /// The status this view belongs to.
    pub fn status(&self) -> ExtractionStatus {
        match self {
            View::Upload { .. } => ExtractionStatus::Idle,
            View::Processing { .. } => ExtractionStatus::Processing,
            View::Result { .. } => ExtractionStatus::Success,
            View::Error { .. } => ExtractionStatus::Error,
        }
    }
}

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Upload { warning } => {
                write!(f, "Select a video file to extract its last frame.")?;
                if let Some(warning) = warning {
                    write!(f, "\nWarning: {warning}")?;
                }
                Ok(())
            }
            View::Processing { file_name } => {
                write!(f, "Extracting the last frame of {file_name}...")
            }
            View::Result { frame } => {
                let (width, height) = frame.dimensions();
                write!(
                    f,
                    "Last frame ready: {} ({width}x{height}, {} bytes, at {:.3}s)\nDownload it, or reset to pick another video.",
                    frame.file_name(),
                    frame.bytes().len(),
                    frame.position().as_secs_f64()
                )
            }
            View::Error { detail } => {
                write!(f, "Error ({}): {detail}\nReset to try again.", detail.kind())
            }
        }
    }
}

/// The run currently allowed to complete.
struct ActiveRun {
    id: RunId,
    input: VideoInput,
    cancellation: CancellationToken,
}

impl ActiveRun {
    fn abandon(self) {
        self.cancellation.cancel();
        log::debug!("Run {} abandoned; released {}", self.id, self.input.name());
    }
}

/// Finite-state controller between the user and the pipeline.
///
/// All methods take `&mut self` and never block; runs execute on tokio's
/// blocking pool via the returned [`ExtractionTicket`].
pub struct ViewController<O: SourceOpener = FfmpegOpener> {
    opener: Arc<O>,
    options: ExtractOptions,
    status: ExtractionStatus,
    last_run: u64,
    active: Option<ActiveRun>,
    frame: Option<ExtractedFrame>,
    error: Option<ErrorDetail>,
    warning: Option<String>,
}

impl<O: SourceOpener> fmt::Debug for ViewController<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewController")
            .field("status", &self.status)
            .field("current_run", &self.current_run())
            .field("has_frame", &self.frame.is_some())
            .field("error", &self.error)
            .field("warning", &self.warning)
            .finish_non_exhaustive()
    }
}

impl ViewController<FfmpegOpener> {
    /// A controller that decodes with FFmpeg.
    pub fn new() -> Self {
        Self::with_opener(FfmpegOpener)
    }
}

impl Default for ViewController<FfmpegOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: SourceOpener> ViewController<O> {
    /// A controller that decodes with `opener`.
    pub fn with_opener(opener: O) -> Self {
        Self {
            opener: Arc::new(opener),
            options: ExtractOptions::new(),
            status: ExtractionStatus::Idle,
            last_run: 0,
            active: None,
            frame: None,
            error: None,
            warning: None,
        }
    }

    /// Options applied to every run.
    ///
    /// Each run gets its own cancellation token; one set here is replaced.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Current status.
    pub fn status(&self) -> ExtractionStatus {
        self.status
    }

    /// The run whose completion will be honored, while processing.
    pub fn current_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|run| run.id)
    }

    /// The input being processed, while processing.
    pub fn input(&self) -> Option<&VideoInput> {
        self.active.as_ref().map(|run| &run.input)
    }

    /// The extracted frame, while showing a result.
    pub fn frame(&self) -> Option<&ExtractedFrame> {
        self.frame.as_ref()
    }

    /// The failure detail, while showing an error.
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    /// Warning from the last rejected selection.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// The view for the current status.
    pub fn view(&self) -> View<'_> {
        match (self.status, &self.active, &self.frame, &self.error) {
            (ExtractionStatus::Processing, Some(run), _, _) => View::Processing {
                file_name: run.input.name(),
            },
            (ExtractionStatus::Success, _, Some(frame), _) => View::Result { frame },
            (ExtractionStatus::Error, _, _, Some(detail)) => View::Error { detail },
            _ => View::Upload {
                warning: self.warning.as_deref(),
            },
        }
    }

    /// Start extracting the last frame of `input`.
    ///
    /// Valid while idle, and while processing, where the new run supersedes
    /// the current one. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::NotAVideo`] if `input` is not a video; the
    ///   status is unchanged and, when idle, the upload view shows a warning.
    /// - [`ControllerError::InvalidIntent`] while a result or error is shown.
    pub fn select_file(&mut self, input: VideoInput) -> Result<ExtractionTicket, ControllerError> {
        if matches!(
            self.status,
            ExtractionStatus::Success | ExtractionStatus::Error
        ) {
            return Err(ControllerError::InvalidIntent {
                intent: "select a file",
                status: self.status,
            });
        }

        if !input.is_video() {
            let error = ControllerError::not_a_video(&input);
            log::warn!("Rejected selection: {error}");
            // Only the upload view shows warnings.
            if self.status == ExtractionStatus::Idle {
                self.warning = Some(format!("Please select a video file. {error}."));
            }
            return Err(error);
        }

        if let Some(previous) = self.active.take() {
            log::info!("Run {} superseded by {}", previous.id, input.name());
            previous.abandon();
        }

        self.last_run += 1;
        let run = RunId(self.last_run);
        let cancellation = CancellationToken::new();
        let options = self.options.clone().with_cancellation(cancellation.clone());

        log::info!("Run {run}: extracting last frame of {}", input.name());
        let task = spawn_extraction(Arc::clone(&self.opener), input.clone(), options);

        self.active = Some(ActiveRun {
            id: run,
            input,
            cancellation,
        });
        self.frame = None;
        self.error = None;
        self.warning = None;
        self.status = ExtractionStatus::Processing;

        Ok(ExtractionTicket { run, task })
    }

    /// Completion point for a successful run.
    ///
    /// Returns `false`, changing nothing, if `run` is not the current run.
    pub fn on_pipeline_success(&mut self, run: RunId, frame: ExtractedFrame) -> bool {
        if !self.is_current(run) {
            log::debug!("Discarding stale result of run {run}");
            return false;
        }
        self.active = None;
        self.frame = Some(frame);
        self.status = ExtractionStatus::Success;
        log::info!("Run {run} succeeded");
        true
    }

    /// Completion point for a failed run.
    ///
    /// Returns `false`, changing nothing, if `run` is not the current run.
    pub fn on_pipeline_failure(&mut self, run: RunId, detail: ErrorDetail) -> bool {
        if !self.is_current(run) {
            log::debug!("Discarding stale failure of run {run}: {detail}");
            return false;
        }
        log::info!("Run {run} failed ({}): {detail}", detail.kind());
        self.active = None;
        self.error = Some(detail);
        self.status = ExtractionStatus::Error;
        true
    }

    /// Route a [`RunOutcome`] to the matching completion point.
    pub fn settle(&mut self, outcome: RunOutcome) -> bool {
        match outcome.result {
            Ok(frame) => self.on_pipeline_success(outcome.run, frame),
            Err(error) => self.on_pipeline_failure(outcome.run, ErrorDetail::from(&error)),
        }
    }

    /// Deliver the extracted frame to `sink` under its suggested filename.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::InvalidIntent`] unless showing a result.
    /// - [`ControllerError::Delivery`] if the sink fails.
    pub fn download<S: DownloadSink + ?Sized>(&self, sink: &mut S) -> Result<(), ControllerError> {
        let frame = match (self.status, &self.frame) {
            (ExtractionStatus::Success, Some(frame)) => frame,
            _ => {
                return Err(ControllerError::InvalidIntent {
                    intent: "download",
                    status: self.status,
                });
            }
        };

        sink.deliver(frame.file_name(), frame.bytes())?;
        log::info!("Delivered {} ({} bytes)", frame.file_name(), frame.bytes().len());
        Ok(())
    }

    /// Discard the result or error and return to idle.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidIntent`] unless showing a result or error.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        if !matches!(
            self.status,
            ExtractionStatus::Success | ExtractionStatus::Error
        ) {
            return Err(ControllerError::InvalidIntent {
                intent: "reset",
                status: self.status,
            });
        }

        if let Some(run) = self.active.take() {
            run.abandon();
        }
        self.frame = None;
        self.error = None;
        self.warning = None;
        self.status = ExtractionStatus::Idle;
        log::debug!("Controller reset");
        Ok(())
    }

    fn is_current(&self, run: RunId) -> bool {
        self.status == ExtractionStatus::Processing
            && self.active.as_ref().is_some_and(|active| active.id == run)
    }
}

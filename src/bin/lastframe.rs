use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lastframe::{
    ControllerError, DirectorySink, ExtractOptions, ExtractionStatus, FfmpegLogLevel,
    FfmpegOpener, PipelineStage, StageObserver, VideoInput, ViewController,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  lastframe extract myclip.mp4\n  lastframe extract myclip.mp4 --out stills --overwrite --progress\n  lastframe probe myclip.mp4 --json\n  lastframe completions zsh > _lastframe";

#[derive(Debug, Parser)]
#[command(
    name = "lastframe",
    version,
    about = "Save the last frame of a video as a JPEG",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a spinner with the current pipeline stage.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting an existing output image.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// JPEG quality of the exported frame (1-100).
    #[arg(long, global = true, default_value_t = 100, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the last frame and save it as <name>_last_frame.jpg.
    #[command(
        about = "Extract the last frame",
        after_help = "Examples:\n  lastframe extract myclip.mp4\n  lastframe extract myclip.mp4 --out stills --json"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,
        /// Directory to save the image into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Print the result as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print duration and dimensions without decoding a frame.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = match &global.log_level {
        Some(level) => level.parse::<FfmpegLogLevel>()?,
        None if global.verbose => FfmpegLogLevel::Warning,
        None => FfmpegLogLevel::Error,
    };
    lastframe::set_ffmpeg_log_level(level);
    Ok(())
}

fn open_input(path: &Path) -> Result<VideoInput, Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("input not found: {}", path.display()).into());
    }
    Ok(VideoInput::from_path(path))
}

fn warn(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl StageObserver for SpinnerProgress {
    fn on_stage(&self, stage: PipelineStage) {
        self.bar.set_message(stage.to_string());
    }
}

async fn extract(
    global: &GlobalOptions,
    input: &Path,
    out: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = open_input(input)?;

    let mut options = ExtractOptions::new().with_quality(global.quality);
    let spinner = global.progress.then(|| Arc::new(SpinnerProgress::new()));
    if let Some(spinner) = &spinner {
        options = options.with_observer(spinner.clone());
    }

    let mut controller = ViewController::new().with_options(options);
    let ticket = match controller.select_file(input) {
        Ok(ticket) => ticket,
        Err(error @ ControllerError::NotAVideo { .. }) => {
            warn(&controller.view().to_string());
            return Err(error.into());
        }
        Err(error) => return Err(error.into()),
    };

    if !json && spinner.is_none() {
        println!("{}", controller.view().to_string().dimmed());
    }

    let outcome = ticket.await;
    controller.settle(outcome);

    if let Some(spinner) = &spinner {
        spinner.bar.finish_and_clear();
    }

    match controller.status() {
        ExtractionStatus::Success => {
            fs::create_dir_all(out)?;
            let mut sink = DirectorySink::new(out).with_overwrite(global.overwrite);
            let Some(frame) = controller.frame().cloned() else {
                return Err("no frame was produced".into());
            };
            let target = sink.target(frame.file_name());
            if global.overwrite && target.exists() {
                warn(&format!("overwriting {}", target.display()));
            }

            controller.download(&mut sink).map_err(|error| match error {
                ControllerError::Delivery(_) => format!(
                    "{error} (use --overwrite to replace {})",
                    target.display()
                ),
                other => other.to_string(),
            })?;

            if json {
                let (width, height) = frame.dimensions();
                let payload = json!({
                    "output": target.display().to_string(),
                    "width": width,
                    "height": height,
                    "bytes": frame.bytes().len(),
                    "position_seconds": frame.position().as_secs_f64(),
                    "duration_seconds": frame.duration().as_secs_f64(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{}", controller.view().to_string().green());
                println!("{} {}", "saved".green().bold(), target.display());
            }
            controller.reset()?;
            Ok(())
        }
        ExtractionStatus::Error => {
            let message = controller
                .error()
                .map(|detail| detail.message().to_string())
                .unwrap_or_else(|| "extraction failed".to_string());
            if !json {
                eprintln!("{}", controller.view().to_string().red());
            }
            controller.reset()?;
            Err(message.into())
        }
        status => Err(format!("extraction ended while {status}").into()),
    }
}

async fn probe(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let input = open_input(input)?;
    if !input.is_video() {
        return Err(ControllerError::not_a_video(&input).into());
    }

    let name = input.name().to_string();
    let metadata = tokio::task::spawn_blocking(move || {
        lastframe::probe(&FfmpegOpener, &input, &ExtractOptions::new())
    })
    .await??;

    if json {
        let payload = json!({
            "input": name,
            "duration_seconds": metadata.duration.as_secs_f64(),
            "width": metadata.width,
            "height": metadata.height,
            "codec": metadata.codec,
            "frames_per_second": metadata.frames_per_second,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{} {}", "File:".bold(), name);
        println!(
            "{} {:.3}s",
            "Duration:".bold(),
            metadata.duration.as_secs_f64()
        );
        println!(
            "{} {}x{} ({}, {:.2} fps)",
            "Video:".bold(),
            metadata.width,
            metadata.height,
            metadata.codec,
            metadata.frames_per_second
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Extract { input, out, json } => extract(&cli.global, &input, &out, json).await?,
        Commands::Probe { input, json } => probe(&input, json).await?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "lastframe", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, probe};
    use clap::{CommandFactory, Parser};
    use lastframe::ControllerError;

    #[tokio::test]
    async fn probe_rejects_non_video_input() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let error = probe(&path, false).await.unwrap_err();
        match error.downcast_ref::<ControllerError>() {
            Some(ControllerError::NotAVideo { name, mime }) => {
                assert_eq!(name, "notes.txt");
                assert_eq!(mime, "text/plain");
            }
            other => panic!("expected NotAVideo, got: {other:?}"),
        }
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_defaults() {
        let cli = Cli::try_parse_from(["lastframe", "extract", "myclip.mp4"]).unwrap();
        assert_eq!(cli.global.quality, 100);
        assert!(!cli.global.overwrite);
        match cli.command {
            Commands::Extract { input, out, json } => {
                assert_eq!(input.to_str(), Some("myclip.mp4"));
                assert_eq!(out.to_str(), Some("."));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn quality_outside_range_is_rejected() {
        assert!(Cli::try_parse_from(["lastframe", "--quality", "0", "extract", "a.mp4"]).is_err());
        assert!(Cli::try_parse_from(["lastframe", "extract", "a.mp4", "--quality", "101"]).is_err());
        let cli = Cli::try_parse_from(["lastframe", "extract", "a.mp4", "--quality", "85"]).unwrap();
        assert_eq!(cli.global.quality, 85);
    }
}

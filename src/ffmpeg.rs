//! FFmpeg log level configuration.
//!
//! FFmpeg prints its own warnings to stderr independently of the Rust
//! [`log`](https://crates.io/crates/log) facade. Decoding the tail of a
//! truncated file in particular can be noisy, so callers can tune FFmpeg's
//! verbosity here without importing `ffmpeg-next` themselves.
//!
//! # Example
//!
//! ```no_run
//! use lastframe::FfmpegLogLevel;
//!
//! lastframe::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let level: FfmpegLogLevel = "quiet".parse().unwrap();
//! lastframe::set_ffmpeg_log_level(level);
//! ```

use std::{fmt, str::FromStr};

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

const LEVELS: [(FfmpegLogLevel, Level, &str); 9] = [
    (FfmpegLogLevel::Quiet, Level::Quiet, "quiet"),
    (FfmpegLogLevel::Panic, Level::Panic, "panic"),
    (FfmpegLogLevel::Fatal, Level::Fatal, "fatal"),
    (FfmpegLogLevel::Error, Level::Error, "error"),
    (FfmpegLogLevel::Warning, Level::Warning, "warning"),
    (FfmpegLogLevel::Info, Level::Info, "info"),
    (FfmpegLogLevel::Verbose, Level::Verbose, "verbose"),
    (FfmpegLogLevel::Debug, Level::Debug, "debug"),
    (FfmpegLogLevel::Trace, Level::Trace, "trace"),
];

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        LEVELS
            .iter()
            .find(|(level, _, _)| *level == self)
            .map_or(Level::Warning, |(_, ffmpeg, _)| *ffmpeg)
    }

    fn from_ffmpeg_level(ffmpeg: Level) -> Option<Self> {
        LEVELS
            .iter()
            .find(|(_, candidate, _)| *candidate == ffmpeg)
            .map(|(level, _, _)| *level)
    }

    /// Lowercase name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        LEVELS
            .iter()
            .find(|(level, _, _)| *level == self)
            .map_or("warning", |(_, _, name)| *name)
    }
}

impl fmt::Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.to_ascii_lowercase();
        let value = if value == "warn" { "warning" } else { value.as_str() };
        LEVELS
            .iter()
            .find(|(_, _, name)| *name == value)
            .map(|(level, _, _)| *level)
            .ok_or_else(|| format!("unknown FFmpeg log level: {value}"))
    }
}

/// Set FFmpeg's own stderr verbosity. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Current FFmpeg verbosity, if it maps to a known level.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .and_then(FfmpegLogLevel::from_ffmpeg_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("QUIET".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Quiet));
        assert_eq!("warn".parse::<FfmpegLogLevel>(), Ok(FfmpegLogLevel::Warning));
        assert!("loud".parse::<FfmpegLogLevel>().is_err());
    }

    #[test]
    fn names_round_trip_through_display() {
        for (level, _, name) in LEVELS {
            assert_eq!(level.to_string(), name);
        }
    }
}

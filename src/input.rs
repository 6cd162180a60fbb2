//! User-selected video inputs.
//!
//! A [`VideoInput`] is the opaque blob handed to the controller: either a file
//! on disk or bytes already in memory, plus the display name used to derive
//! the output filename.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Suffix appended to the input's base name for the exported image.
pub const LAST_FRAME_SUFFIX: &str = "_last_frame.jpg";

/// Where the bytes of a [`VideoInput`] live.
#[derive(Clone)]
pub(crate) enum InputData {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// A video selected by the user.
///
/// Cloning is cheap: in-memory payloads are reference counted.
///
/// # Example
///
/// ```
/// use lastframe::VideoInput;
///
/// let input = VideoInput::from_bytes("myclip.mp4", vec![0u8; 16]);
/// assert!(input.is_video());
/// assert_eq!(input.suggested_file_name(), "myclip_last_frame.jpg");
/// ```
#[derive(Clone)]
pub struct VideoInput {
    name: String,
    mime: Option<String>,
    pub(crate) data: InputData,
}

impl Debug for VideoInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut debug = f.debug_struct("VideoInput");
        debug.field("name", &self.name).field("mime", &self.mime);
        match &self.data {
            InputData::File(path) => debug.field("path", path),
            InputData::Memory(bytes) => debug.field("bytes", &bytes.len()),
        };
        debug.finish()
    }
}

impl VideoInput {
    /// Reference a video file on disk.
    ///
    /// The display name is the path's file name and the MIME type is guessed
    /// from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = guess_mime(&name);

        Self {
            name,
            mime,
            data: InputData::File(path.to_path_buf()),
        }
    }

    /// Wrap an in-memory video payload.
    ///
    /// The MIME type is guessed from `name`; use
    /// [`with_mime`](VideoInput::with_mime) when the caller knows better.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let mime = guess_mime(&name);

        Self {
            name,
            mime,
            data: InputData::Memory(bytes.into()),
        }
    }

    /// Override the detected MIME type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Display name of the input (e.g. `"myclip.mp4"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type, if one was supplied or could be guessed.
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Whether the input is a video according to its MIME type.
    ///
    /// Inputs with no known type are not videos.
    pub fn is_video(&self) -> bool {
        self.mime
            .as_deref()
            .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("video/"))
    }

    /// The display name with its last extension removed.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Filename offered for the exported frame: `<base-name>_last_frame.jpg`.
    pub fn suggested_file_name(&self) -> String {
        format!("{}{LAST_FRAME_SUFFIX}", self.base_name())
    }

    /// The extension of the display name, without the dot.
    pub(crate) fn extension(&self) -> Option<&str> {
        let base = self.base_name();
        if base.len() == self.name.len() {
            None
        } else {
            Some(&self.name[base.len() + 1..])
        }
    }
}

fn guess_mime(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Strip the last extension from a file name.
///
/// A leading dot does not start an extension, so dotfiles keep their name.
pub(crate) fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_only_the_last_extension() {
        assert_eq!(base_name("myclip.mp4"), "myclip");
        assert_eq!(base_name("holiday.2024.mov"), "holiday.2024");
        assert_eq!(base_name("noext"), "noext");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn extension_follows_base_name() {
        let input = VideoInput::from_bytes("clip.final.webm", Vec::new());
        assert_eq!(input.extension(), Some("webm"));

        let input = VideoInput::from_bytes("clip", Vec::new());
        assert_eq!(input.extension(), None);
    }

    #[test]
    fn unknown_extension_is_not_a_video() {
        let input = VideoInput::from_bytes("blob.unknownext", Vec::new());
        assert_eq!(input.mime(), None);
        assert!(!input.is_video());
    }

    #[test]
    fn explicit_mime_wins_over_guess() {
        let input = VideoInput::from_bytes("notes.txt", Vec::new()).with_mime("video/mp4");
        assert!(input.is_video());
    }
}

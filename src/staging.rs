//! Decodable references to video inputs.
//!
//! FFmpeg demuxers read from a path, so in-memory inputs are written to a
//! named temporary file for the duration of a run. [`StagedInput`] owns that
//! reference; dropping it releases the temp file exactly once, whichever way
//! the run ends.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::{Builder as TempFileBuilder, NamedTempFile};

use crate::{
    error::ExtractionError,
    input::{InputData, VideoInput},
};

/// A path a decoder can open, valid until this value is dropped.
#[derive(Debug)]
pub struct StagedInput {
    path: PathBuf,
    temporary: Option<NamedTempFile>,
}

impl StagedInput {
    /// Stage `input` for decoding.
    ///
    /// File-backed inputs are used in place. In-memory inputs are copied to a
    /// temp file that keeps the original extension so container probing
    /// behaves the same as for the file itself.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::LoadFailed`] if the temp file cannot be
    /// created or written.
    pub fn stage(input: &VideoInput) -> Result<Self, ExtractionError> {
        match &input.data {
            InputData::File(path) => Ok(Self {
                path: path.clone(),
                temporary: None,
            }),
            InputData::Memory(bytes) => {
                let suffix = input
                    .extension()
                    .map(|extension| format!(".{extension}"))
                    .unwrap_or_default();

                let mut file = TempFileBuilder::new()
                    .prefix("lastframe-")
                    .suffix(&suffix)
                    .tempfile()
                    .map_err(|error| {
                        ExtractionError::LoadFailed(format!(
                            "could not stage {}: {error}",
                            input.name()
                        ))
                    })?;

                file.write_all(bytes)
                    .and_then(|()| file.flush())
                    .map_err(|error| {
                        ExtractionError::LoadFailed(format!(
                            "could not stage {}: {error}",
                            input.name()
                        ))
                    })?;

                let path = file.path().to_path_buf();
                log::debug!(
                    "Staged {} ({} bytes) at {}",
                    input.name(),
                    bytes.len(),
                    path.display()
                );

                Ok(Self {
                    path,
                    temporary: Some(file),
                })
            }
        }
    }

    /// Path to hand to the decoder.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this reference owns a temp file.
    pub fn is_temporary(&self) -> bool {
        self.temporary.is_some()
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        if let Some(file) = self.temporary.take() {
            if let Err(error) = file.close() {
                log::warn!(
                    "Failed to remove staged input {}: {error}",
                    self.path.display()
                );
            } else {
                log::debug!("Released staged input {}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_inputs_are_used_in_place() {
        let input = VideoInput::from_path("/videos/myclip.mp4");
        let staged = StagedInput::stage(&input).unwrap();
        assert_eq!(staged.path(), Path::new("/videos/myclip.mp4"));
        assert!(!staged.is_temporary());
    }

    #[test]
    fn memory_inputs_are_removed_on_drop() {
        let input = VideoInput::from_bytes("myclip.mp4", vec![1u8, 2, 3]);
        let staged = StagedInput::stage(&input).unwrap();
        let path = staged.path().to_path_buf();

        assert!(staged.is_temporary());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1u8, 2, 3]);

        drop(staged);
        assert!(!path.exists());
    }
}

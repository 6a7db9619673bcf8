//! Upload directory
//!
//! Stores incoming recordings as `<ValveLabel>_<originalFileName>`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{write_clip, AudioClip};
use crate::error::{HeartestError, Result};
use crate::records::case::ValveSite;

/// Original name given to microphone recordings
pub const RECORDING_FILE: &str = "recorded.wav";

/// Directory holding every stored recording
#[derive(Debug, Clone)]
pub struct UploadDirectory {
    root: PathBuf,
}

impl UploadDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Name a recording for a valve: `<ValveLabel>_<basename>`
    ///
    /// Any directory part of `original_name` (either slash style) is dropped.
    /// Commas become underscores since the case log joins names with ", ".
    pub fn stored_name(valve: ValveSite, original_name: &str) -> Result<String> {
        let base = original_name
            .rsplit(is_separator)
            .next()
            .unwrap_or_default()
            .trim();

        if base.is_empty() || base == "." || base == ".." {
            return Err(HeartestError::invalid_parameter(
                "file_name",
                original_name,
                "a file name",
            ));
        }
        Ok(format!("{}_{}", valve.label(), base.replace(',', "_")))
    }

    /// Check a name refers to a file directly inside the upload directory
    ///
    /// # Errors
    /// * `InvalidParameter` - If the name is empty, `.`/`..` or has a path separator
    pub fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(is_separator) {
            return Err(HeartestError::invalid_parameter(
                "stored_name",
                name,
                "a file name inside the upload directory",
            ));
        }
        Ok(())
    }

    /// Write uploaded bytes for a valve and return the stored name
    pub fn store(&self, valve: ValveSite, original_name: &str, bytes: &[u8]) -> Result<String> {
        let name = Self::stored_name(valve, original_name)?;
        self.ensure()?;
        fs::write(self.root.join(&name), bytes)?;

        log::info!("Stored {} recording as {}", valve, name);
        Ok(name)
    }

    /// Write a captured clip as the recording for a valve
    pub fn store_recording(&self, valve: ValveSite, clip: &AudioClip) -> Result<String> {
        let name = Self::stored_name(valve, RECORDING_FILE)?;
        self.ensure()?;
        write_clip(clip, &self.root.join(&name))?;

        log::info!(
            "Saved {} microphone recording ({:.1}s) as {}",
            valve,
            clip.duration_secs(),
            name
        );
        Ok(name)
    }

    /// Path a stored file would have, whether or not it exists
    ///
    /// `name` is trusted; use [`UploadDirectory::resolve`] for names from
    /// the command line or the case log.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of an existing stored file
    ///
    /// # Errors
    /// * `InvalidParameter` - If the name points outside the directory
    /// * `FileNotFound` - If no such file is stored
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        Self::check_name(name)?;
        let path = self.path_of(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(HeartestError::FileNotFound { path })
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

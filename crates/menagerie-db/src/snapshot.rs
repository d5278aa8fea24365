//! Snapshot persistence for the non-sensitive world state.
//!
//! The snapshot is one JSON document (pets + cursors) written as a
//! complete replace. Writes go to a sibling temp file first and are
//! renamed into place, so a crash mid-write leaves the previous
//! snapshot intact.

use std::path::{Path, PathBuf};

use menagerie_types::SnapshotDocument;

use crate::error::DbError;

/// Reads and writes the snapshot document at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store bound to the given snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path the snapshot document is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot document.
    ///
    /// A missing file is a fresh world, not an error: it loads as an
    /// empty document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file exists but cannot be read,
    /// or [`DbError::Serialization`] if its content is not a valid
    /// snapshot document.
    pub async fn load(&self) -> Result<SnapshotDocument, DbError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(SnapshotDocument::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the snapshot document, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the document cannot be
    /// encoded, or [`DbError::Io`] if the temp write or rename fails.
    pub async fn write(&self, document: &SnapshotDocument) -> Result<(), DbError> {
        let bytes = serde_json::to_vec_pretty(document)?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            pets = document.pets.len(),
            cursors = document.cursors.len(),
            "Snapshot written"
        );
        Ok(())
    }

    /// Sibling temp path used for the write-then-rename replace.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map_or_else(
            || std::ffi::OsString::from("snapshot"),
            std::ffi::OsStr::to_os_string,
        );
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

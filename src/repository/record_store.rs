//! CSV-backed store of workout records, one row per screenshot.
//!
//! Every mutation reads the whole file, modifies it in memory and writes it
//! back through a temporary file in the same directory. A single writer is
//! assumed; there is no locking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{StoredRow, WorkoutRecord, STORE_COLUMNS};

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O failure on {path}: {message}")]
    IoFailure { path: PathBuf, message: String },

    #[error("Existing store {path} is corrupt: {reason}")]
    CorruptExistingStore { path: PathBuf, reason: String },
}

/// What `append` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// A row for this image already existed; nothing was written.
    AlreadyPresent,
}

/// Record store at a fixed path.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty store with the header row if none exists.
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        info!("Creating record store at {}", self.path.display());
        self.write_all(&[])
    }

    /// All rows in file order. An absent or zero-length file is an empty store;
    /// one that exists but cannot be read is corrupt.
    pub fn load(&self) -> Result<Vec<StoredRow>, StoreError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.corrupt(format!("unreadable: {}", e))),
        };
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| self.corrupt(format!("unreadable header: {}", e)))?;
        if !headers.iter().eq(STORE_COLUMNS.iter().copied()) {
            return Err(self.corrupt(format!(
                "unexpected header {:?}, expected {:?}",
                headers.iter().collect::<Vec<_>>(),
                STORE_COLUMNS
            )));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.deserialize::<StoredRow>().enumerate() {
            // Line 1 is the header.
            let row = result.map_err(|e| self.corrupt(format!("line {}: {}", index + 2, e)))?;
            rows.push(row);
        }
        debug!("Loaded {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Whether a row for `image_id` is already stored.
    pub fn exists(&self, image_id: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.iter().any(|row| row.image_file == image_id))
    }

    /// Append a row for `image_id`, rewriting the whole store.
    pub fn append(
        &self,
        record: &WorkoutRecord,
        image_id: &str,
    ) -> Result<AppendOutcome, StoreError> {
        let mut rows = self.load()?;
        if rows.iter().any(|row| row.image_file == image_id) {
            debug!("{} already stored, skipping append", image_id);
            return Ok(AppendOutcome::AlreadyPresent);
        }

        rows.push(StoredRow::new(image_id, record));
        self.write_all(&rows)?;
        info!(
            "Stored record for {} ({} rows total)",
            image_id,
            rows.len()
        );
        Ok(AppendOutcome::Appended)
    }

    fn write_all(&self, rows: &[StoredRow]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer
                .write_record(STORE_COLUMNS)
                .map_err(|e| self.io_error(e))?;
            for row in rows {
                writer.serialize(row).map_err(|e| self.io_error(e))?;
            }
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn io_error(&self, err: impl std::fmt::Display) -> StoreError {
        StoreError::IoFailure {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::CorruptExistingStore {
            path: self.path.clone(),
            reason,
        }
    }
}

//! Batch processing of a screenshots directory.
//!
//! Images are handled one at a time: analyzed, then stored, before the next
//! begins. Progress is reported through events so the CLI can render it
//! without this module knowing about terminals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::WorkoutRecord;
use crate::pipeline::{AnalysisPipeline, PipelineError};
use crate::repository::{AppendOutcome, RecordStore, StoreError};
use crate::utils::mime::is_supported_screenshot;

/// Suffix of intermediate files left by image preprocessing; never inputs.
const PROCESSED_SUFFIX: &str = "_processed.jpg";

/// Errors that stop a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to scan {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to one image.
#[derive(Debug)]
pub enum ImageOutcome {
    Stored(WorkoutRecord),
    /// Already in the store; no requests were made.
    Duplicate,
    Failed(PipelineError),
}

/// Progress events emitted during a batch.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started { total: usize },
    ImageStarted { index: usize, file_name: &'a str },
    ImageFinished {
        index: usize,
        file_name: &'a str,
        outcome: &'a ImageOutcome,
    },
    Pausing { delay: Duration },
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Per-image outcomes in processing order.
    pub outcomes: Vec<(String, ImageOutcome)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// List screenshot files in `dir`, sorted by path.
pub fn scan_screenshots(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let scan_error = |source| BatchError::ScanFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_error)? {
        let path = entry.map_err(scan_error)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.to_lowercase().ends_with(PROCESSED_SUFFIX) || !is_supported_screenshot(name) {
            continue;
        }
        images.push(path);
    }
    images.sort();
    Ok(images)
}

/// Runs the pipeline over a directory and stores new records.
pub struct BatchRunner {
    pipeline: AnalysisPipeline,
    store: RecordStore,
    pacing_delay: Duration,
}

impl BatchRunner {
    pub fn new(pipeline: AnalysisPipeline, store: RecordStore, pacing_delay: Duration) -> Self {
        Self {
            pipeline,
            store,
            pacing_delay,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Process every screenshot in `dir`.
    ///
    /// Per-image pipeline failures are recorded and skipped. Store failures
    /// abort the batch.
    pub fn run<F>(&self, dir: &Path, mut on_event: F) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(BatchEvent<'_>),
    {
        let images = scan_screenshots(dir)?;
        self.store.ensure_exists()?;

        info!("Found {} screenshots in {}", images.len(), dir.display());
        on_event(BatchEvent::Started {
            total: images.len(),
        });

        let mut summary = BatchSummary::default();
        for (index, path) in images.iter().enumerate() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            on_event(BatchEvent::ImageStarted {
                index,
                file_name: &file_name,
            });

            let outcome = self.process_image(path, &file_name)?;
            on_event(BatchEvent::ImageFinished {
                index,
                file_name: &file_name,
                outcome: &outcome,
            });

            let made_requests = !matches!(outcome, ImageOutcome::Duplicate);
            match outcome {
                ImageOutcome::Stored(_) => summary.stored += 1,
                ImageOutcome::Duplicate => summary.duplicates += 1,
                ImageOutcome::Failed(_) => summary.failed += 1,
            }
            summary.outcomes.push((file_name, outcome));

            let is_last = index + 1 == images.len();
            if made_requests && !is_last && !self.pacing_delay.is_zero() {
                on_event(BatchEvent::Pausing {
                    delay: self.pacing_delay,
                });
                std::thread::sleep(self.pacing_delay);
            }
        }

        info!(
            "Batch complete: {} stored, {} duplicates, {} failed",
            summary.stored, summary.duplicates, summary.failed
        );
        Ok(summary)
    }

    fn process_image(&self, path: &Path, file_name: &str) -> Result<ImageOutcome, BatchError> {
        if self.store.exists(file_name)? {
            info!("{} already processed, skipping", file_name);
            return Ok(ImageOutcome::Duplicate);
        }

        info!("Processing {}", file_name);
        let record = match self.pipeline.analyze(path) {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to analyze {}: {}", file_name, e);
                return Ok(ImageOutcome::Failed(e));
            }
        };

        if record.is_empty() {
            warn!("No workout fields recognized in {}", file_name);
        }

        match self.store.append(&record, file_name)? {
            AppendOutcome::Appended => Ok(ImageOutcome::Stored(record)),
            AppendOutcome::AlreadyPresent => Ok(ImageOutcome::Duplicate),
        }
    }
}

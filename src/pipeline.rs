//! Two-stage analysis of a single screenshot.
//!
//! Extracting (image to text) runs first; Interpreting (text to record) runs
//! only if it succeeded. A fixed pause separates the two requests to stay
//! under upstream rate limits. Nothing is retried and nothing is persisted
//! here.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::llm::{AnalysisError, ChatClient, FieldExtractor, StructuredFieldExtractor};
use crate::models::WorkoutRecord;
use crate::ocr::{ExtractionError, OcrBackend};

/// Errors from one pipeline run, tagged by the failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractionError),

    #[error("Field extraction failed: {0}")]
    AnalysisFailed(#[source] AnalysisError),
}

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Extracting,
    Interpreting,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Interpreting => "interpreting",
            PipelineStage::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OCR backend plus field extractor, run back to back.
pub struct AnalysisPipeline {
    backend: Box<dyn OcrBackend>,
    extractor: Box<dyn FieldExtractor>,
    stage_delay: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        backend: Box<dyn OcrBackend>,
        extractor: Box<dyn FieldExtractor>,
        stage_delay: Duration,
    ) -> Self {
        Self {
            backend,
            extractor,
            stage_delay,
        }
    }

    /// Build the interpretation stage from settings around an already
    /// selected backend.
    pub fn from_settings(
        settings: &Settings,
        backend: Box<dyn OcrBackend>,
        client: ChatClient,
    ) -> Self {
        let extractor =
            StructuredFieldExtractor::new(client, &settings.api.chat_model, &settings.prompts);
        Self::new(
            backend,
            Box::new(extractor),
            Duration::from_millis(settings.pipeline.stage_delay_ms),
        )
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    pub fn stage_delay(&self) -> Duration {
        self.stage_delay
    }

    /// Run both stages on one image.
    pub fn analyze(&self, image_path: &Path) -> Result<WorkoutRecord, PipelineError> {
        let mut stage = PipelineStage::Idle;
        self.transition(&mut stage, PipelineStage::Extracting, image_path);

        let ocr = self.backend.ocr_image(image_path).map_err(|e| {
            warn!("Text extraction failed for {}: {}", image_path.display(), e);
            PipelineError::ExtractionFailed(e)
        })?;
        info!(
            "Extracted {} characters with {} in {}ms",
            ocr.text.chars().count(),
            ocr.backend,
            ocr.processing_time_ms
        );

        if !self.stage_delay.is_zero() {
            debug!("Waiting {:?} before interpretation", self.stage_delay);
            std::thread::sleep(self.stage_delay);
        }

        self.transition(&mut stage, PipelineStage::Interpreting, image_path);
        let record = self.extractor.extract_fields(&ocr.text).map_err(|e| {
            warn!("Field extraction failed for {}: {}", image_path.display(), e);
            PipelineError::AnalysisFailed(e)
        })?;

        self.transition(&mut stage, PipelineStage::Done, image_path);
        Ok(record)
    }

    fn transition(&self, stage: &mut PipelineStage, next: PipelineStage, image_path: &Path) {
        debug!("{}: {} -> {}", image_path.display(), stage, next);
        *stage = next;
    }
}

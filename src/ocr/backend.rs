//! Text extraction backend abstraction.
//!
//! Two backends exist:
//! - Vision: a vision-capable chat model behind the completions endpoint
//! - PaddleOCR: local CNN-based recognition via ONNX Runtime (feature: ocr-paddle)
//!
//! The backend is chosen once when the pipeline is built and never changes
//! during a run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::llm::ChatError;

/// Errors from text extraction backends.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("OCR request failed: {0}")]
    TransportFailure(String),

    #[error("OCR endpoint returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),

    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Text recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("Failed to read image {path}: {source}")]
    ImageUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ChatError> for ExtractionError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Transport(msg) => ExtractionError::TransportFailure(msg),
            ChatError::Status { code, .. } => ExtractionError::UpstreamStatus(code),
            ChatError::Malformed(msg) => ExtractionError::MalformedResponse(msg),
        }
    }
}

/// Result of text extraction on one image.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Extracted text, verbatim. May be empty or noisy.
    pub text: String,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Which model was used, for remote backends.
    pub model: Option<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// Vision model via the chat-completions API.
    Vision,
    /// PaddleOCR via ONNX Runtime.
    PaddleOcr,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Vision => "vision",
            OcrBackendType::PaddleOcr => "paddleocr",
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for text extraction backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend can run (engine initialized, credentials present).
    fn is_available(&self) -> bool;

    /// Describe the backend's state, or what's needed to make it available.
    fn availability_hint(&self) -> String;

    /// Extract text from an image file.
    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, ExtractionError>;
}

/// Build an OcrResult from text and timing info.
pub fn build_ocr_result(
    text: String,
    backend: OcrBackendType,
    model: Option<String>,
    start: std::time::Instant,
) -> OcrResult {
    OcrResult {
        text,
        backend,
        model,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

//! Text extraction from run screenshots.
//!
//! ## Backends
//!
//! - **Vision**: a vision-capable chat model describes the screenshot (default)
//! - **PaddleOCR**: CNN-based local recognition via ONNX (feature: ocr-paddle)
//!
//! `select_backend` picks one per run, falling back to Vision when the local
//! engine can't start.

mod backend;
mod local;
mod select;
mod vision;

#[cfg(feature = "ocr-paddle")]
mod model_utils;
#[cfg(feature = "ocr-paddle")]
mod paddle_backend;

pub use backend::{build_ocr_result, ExtractionError, OcrBackend, OcrBackendType, OcrResult};
pub use local::{LocalOcrEngine, TextRecognizer};
pub use select::{select_backend, select_backend_with};
pub use vision::VisionBackend;

#[cfg(feature = "ocr-paddle")]
pub use paddle_backend::PaddleRecognizer;

//! Local OCR engine backend.
//!
//! Wraps an on-device text recognizer. Initialization happens once, at
//! construction; if it fails (or the crate was built without a recognizer)
//! the engine stays constructed but reports itself unavailable, so callers
//! can pick another backend instead of crashing.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use tracing::info;

use super::backend::{build_ocr_result, ExtractionError, OcrBackend, OcrBackendType, OcrResult};
use crate::config::OcrSettings;

/// A recognizer returning text fragments in reading order.
pub trait TextRecognizer: Send {
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<String>, String>;
}

/// Local OCR backend over a [`TextRecognizer`].
pub struct LocalOcrEngine {
    recognizer: Result<Mutex<Box<dyn TextRecognizer>>, String>,
}

impl LocalOcrEngine {
    /// Initialize the built-in recognizer from settings.
    pub fn initialize(settings: &OcrSettings) -> Self {
        #[cfg(feature = "ocr-paddle")]
        {
            match super::paddle_backend::PaddleRecognizer::new(settings) {
                Ok(recognizer) => {
                    info!("PaddleOCR initialized");
                    Self::with_recognizer(Box::new(recognizer))
                }
                Err(e) => {
                    tracing::warn!("PaddleOCR initialization failed: {}", e);
                    Self::unavailable(e.to_string())
                }
            }
        }

        #[cfg(not(feature = "ocr-paddle"))]
        {
            let _ = settings;
            Self::unavailable("built without the ocr-paddle feature")
        }
    }

    /// Wrap an already-initialized recognizer.
    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer>) -> Self {
        Self {
            recognizer: Ok(Mutex::new(recognizer)),
        }
    }

    /// An engine that failed to initialize.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            recognizer: Err(reason.into()),
        }
    }
}

impl OcrBackend for LocalOcrEngine {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        self.recognizer.is_ok()
    }

    fn availability_hint(&self) -> String {
        match &self.recognizer {
            Ok(_) => "Local OCR engine is available".to_string(),
            Err(reason) => format!("Local OCR engine unavailable: {}", reason),
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, ExtractionError> {
        let recognizer = self
            .recognizer
            .as_ref()
            .map_err(|reason| ExtractionError::EngineUnavailable(reason.clone()))?;

        if !image_path.exists() {
            return Err(ExtractionError::ImageUnreadable {
                path: image_path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "image file not found"),
            });
        }

        let start = Instant::now();
        let mut recognizer = recognizer.lock().map_err(|e| {
            ExtractionError::RecognitionFailure(format!("Failed to lock OCR engine: {}", e))
        })?;
        let fragments = recognizer
            .recognize(image_path)
            .map_err(ExtractionError::RecognitionFailure)?;

        let text = fragments.join("\n");
        info!(
            "Local OCR succeeded, {} fragments, {} characters",
            fragments.len(),
            text.chars().count()
        );
        Ok(build_ocr_result(text, OcrBackendType::PaddleOcr, None, start))
    }
}

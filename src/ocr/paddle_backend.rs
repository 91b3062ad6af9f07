//! PaddleOCR recognizer.
//!
//! Uses paddle-ocr-rs for OCR via ONNX Runtime. PP-OCRv4 Chinese models
//! (which also read Latin digits and units) are downloaded on first use from:
//! https://github.com/RapidAI/RapidOCR

use std::path::Path;

use paddle_ocr_rs::ocr_lite::OcrLite;

use super::backend::ExtractionError;
use super::local::TextRecognizer;
use super::model_utils::{ensure_models_present, ModelDirConfig, ModelSpec};
use crate::config::OcrSettings;

/// Model directory configuration for PaddleOCR.
const MODEL_CONFIG: ModelDirConfig = ModelDirConfig {
    subdir: "paddle-ocr",
    required_files: &[DET_MODEL_NAME, CLS_MODEL_NAME, REC_MODEL_NAME],
};

const DET_MODEL_NAME: &str = "ch_PP-OCRv4_det_infer.onnx";
const REC_MODEL_NAME: &str = "ch_PP-OCRv4_rec_infer.onnx";
const CLS_MODEL_NAME: &str = "ch_ppocr_mobile_v2.0_cls_infer.onnx";

const DET_MODEL: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
    filename: DET_MODEL_NAME,
    size_hint: "4 MB",
};

const REC_MODEL: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
    filename: REC_MODEL_NAME,
    size_hint: "10 MB",
};

const CLS_MODEL: ModelSpec = ModelSpec {
    url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
    filename: CLS_MODEL_NAME,
    size_hint: "1 MB",
};

/// Initialized PaddleOCR engine.
pub struct PaddleRecognizer {
    engine: OcrLite,
}

impl PaddleRecognizer {
    /// Locate (or download) the models and initialize the engine.
    pub fn new(settings: &OcrSettings) -> Result<Self, ExtractionError> {
        let model_dir = ensure_models_present(
            settings.model_dir.as_ref(),
            &MODEL_CONFIG,
            &[&DET_MODEL, &REC_MODEL, &CLS_MODEL],
        )?;

        let det_model = model_dir.join(DET_MODEL_NAME);
        let cls_model = model_dir.join(CLS_MODEL_NAME);
        let rec_model = model_dir.join(REC_MODEL_NAME);

        let mut engine = OcrLite::new();
        engine
            .init_models(
                &det_model.to_string_lossy(),
                &cls_model.to_string_lossy(),
                &rec_model.to_string_lossy(),
                settings.threads.max(1),
            )
            .map_err(|e| {
                ExtractionError::EngineUnavailable(format!("Failed to init PaddleOCR: {}", e))
            })?;

        Ok(Self { engine })
    }
}

impl TextRecognizer for PaddleRecognizer {
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<String>, String> {
        let path = image_path
            .to_str()
            .ok_or_else(|| format!("Non UTF-8 image path: {}", image_path.display()))?;

        let result = self
            .engine
            .detect_from_path(
                path,  // image path
                50,    // padding
                1024,  // max side length
                0.5,   // box score threshold
                0.3,   // unclip ratio
                1.6,   // box threshold
                false, // do angle
                false, // most angle
            )
            .map_err(|e| format!("PaddleOCR detection failed: {}", e))?;

        Ok(result
            .text_blocks
            .iter()
            .map(|block| block.text.clone())
            .collect())
    }
}

//! Single-image commands: full analysis and text extraction only.

use std::path::Path;

use console::style;

use super::helpers::{analysis_pipeline, ocr_backend, with_backend};
use crate::config::{BackendPreference, Settings};

/// Run both stages on one image and print the record as JSON.
pub fn cmd_analyze(
    settings: Settings,
    image: &Path,
    backend: Option<BackendPreference>,
) -> anyhow::Result<()> {
    let settings = with_backend(settings, backend);
    let pipeline = analysis_pipeline(&settings)?;

    eprintln!(
        "{} Analyzing {} ({})",
        style("→").cyan(),
        image.display(),
        pipeline.backend().backend_type()
    );
    let record = pipeline.analyze(image)?;

    if record.is_empty() {
        eprintln!(
            "{} No workout fields recognized",
            style("!").yellow()
        );
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Extract text from one image and print it.
pub fn cmd_ocr(
    settings: Settings,
    image: &Path,
    backend: Option<BackendPreference>,
) -> anyhow::Result<()> {
    let settings = with_backend(settings, backend);
    let backend = ocr_backend(&settings)?;

    let result = backend.ocr_image(image)?;
    eprintln!(
        "{} {} characters via {}{} in {}ms",
        style("✓").green(),
        result.text.chars().count(),
        result.backend,
        result
            .model
            .as_deref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default(),
        result.processing_time_ms
    );
    println!("{}", result.text);
    Ok(())
}

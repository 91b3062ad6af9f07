//! Model file management for the local OCR engine.
//!
//! Locates model files in the configured directory or standard data
//! directories, downloading them with curl or wget on first use.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::backend::ExtractionError;

/// Model file specification for downloading.
pub struct ModelSpec {
    /// URL to download from.
    pub url: &'static str,
    /// Filename to save as.
    pub filename: &'static str,
    /// Human-readable size for progress messages.
    pub size_hint: &'static str,
}

/// Configuration for model directory management.
pub struct ModelDirConfig {
    /// Subdirectory name under data_dir (e.g. "paddle-ocr").
    pub subdir: &'static str,
    /// Required model files to check for presence.
    pub required_files: &'static [&'static str],
}

impl ModelDirConfig {
    /// Default model directory for this engine.
    pub fn default_dir(&self) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(self.subdir)
            .join("models")
    }

    /// Standard candidate directories to search for models.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        [
            dirs::data_dir().map(|d| d.join(self.subdir).join("models")),
            dirs::home_dir().map(|d| d.join(format!(".{}", self.subdir)).join("models")),
            Some(PathBuf::from(format!("./models/{}", self.subdir))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Check if a directory contains all required model files.
    pub fn has_required_files(&self, dir: &Path) -> bool {
        self.required_files
            .iter()
            .all(|file| dir.join(file).exists())
    }
}

/// Download a file from a URL to a local path using curl, or wget if curl is missing.
pub fn download_file(url: &str, dest: &Path) -> Result<(), ExtractionError> {
    let status = Command::new("curl")
        .args(["-fsSL", "-o"])
        .arg(dest)
        .arg(url)
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => {
            let _ = std::fs::remove_file(dest);
            Err(ExtractionError::EngineUnavailable(format!(
                "Failed to download {}",
                url
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            match Command::new("wget").args(["-q", "-O"]).arg(dest).arg(url).status() {
                Ok(status) if status.success() => Ok(()),
                Ok(_) => {
                    let _ = std::fs::remove_file(dest);
                    Err(ExtractionError::EngineUnavailable(format!(
                        "Failed to download {}",
                        url
                    )))
                }
                Err(_) => Err(ExtractionError::EngineUnavailable(
                    "Neither curl nor wget found. Install one to download models.".to_string(),
                )),
            }
        }
        Err(e) => Err(ExtractionError::EngineUnavailable(format!(
            "Failed to run curl: {}",
            e
        ))),
    }
}

/// Download a model file if it doesn't exist.
pub fn ensure_model_file(spec: &ModelSpec, model_dir: &Path) -> Result<(), ExtractionError> {
    let dest = model_dir.join(spec.filename);
    if !dest.exists() {
        info!("Downloading {} (~{})", spec.filename, spec.size_hint);
        download_file(spec.url, &dest)?;
        info!("Downloaded {}", spec.filename);
    }
    Ok(())
}

/// Find model directory by checking config path first, then standard locations.
pub fn find_model_dir(
    config_path: Option<&PathBuf>,
    model_config: &ModelDirConfig,
) -> Option<PathBuf> {
    if let Some(path) = config_path {
        if model_config.has_required_files(path) {
            return Some(path.clone());
        }
    }

    model_config
        .candidate_dirs()
        .into_iter()
        .find(|dir| model_config.has_required_files(dir))
}

/// Ensure models are present, downloading if necessary.
pub fn ensure_models_present(
    config_path: Option<&PathBuf>,
    model_config: &ModelDirConfig,
    model_specs: &[&ModelSpec],
) -> Result<PathBuf, ExtractionError> {
    if let Some(dir) = find_model_dir(config_path, model_config) {
        return Ok(dir);
    }

    let model_dir = config_path
        .cloned()
        .unwrap_or_else(|| model_config.default_dir());
    std::fs::create_dir_all(&model_dir).map_err(|e| {
        ExtractionError::EngineUnavailable(format!(
            "Failed to create model directory {}: {}",
            model_dir.display(),
            e
        ))
    })?;

    for spec in model_specs {
        ensure_model_file(spec, &model_dir)?;
    }

    Ok(model_dir)
}

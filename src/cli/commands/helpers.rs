//! Shared helper functions for CLI commands.

use std::path::Path;

use anyhow::Context;

use crate::config::{BackendPreference, Settings};
use crate::llm::ChatClient;
use crate::ocr::{select_backend, OcrBackend};
use crate::pipeline::AnalysisPipeline;

/// Load settings from the given config file (or `runlog.toml`) plus environment.
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    Settings::load(config).context("Failed to load configuration")
}

/// Apply a `--backend` override.
pub fn with_backend(mut settings: Settings, backend: Option<BackendPreference>) -> Settings {
    if let Some(backend) = backend {
        settings.ocr.backend = backend;
    }
    settings
}

/// Chat client for the configured endpoint. Fails if no API key is set.
pub fn chat_client(settings: &Settings) -> anyhow::Result<ChatClient> {
    let api_key = settings.require_api_key()?;
    Ok(ChatClient::from_config(&settings.api, api_key)?)
}

/// Select the OCR backend. An API key is only required for the remote one.
pub fn ocr_backend(settings: &Settings) -> anyhow::Result<Box<dyn OcrBackend>> {
    select_backend(settings, || chat_client(settings))
}

/// Full two-stage pipeline.
pub fn analysis_pipeline(settings: &Settings) -> anyhow::Result<AnalysisPipeline> {
    let client = chat_client(settings)?;
    let backend = select_backend(settings, || Ok::<_, anyhow::Error>(client.clone()))?;
    Ok(AnalysisPipeline::from_settings(settings, backend, client))
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

//! Configuration management for runlog.
//!
//! Settings come from built-in defaults, an optional TOML file and then
//! environment variables, in increasing priority. The resulting value is
//! immutable and handed to each component at construction.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::prompts::{DEFAULT_ANALYSIS_PROMPT, DEFAULT_JSON_FORMAT, DEFAULT_OCR_PROMPT};

/// Config file name looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "runlog.toml";

/// Places searched for a config file, in priority order: the working
/// directory, then `<config_dir>/runlog/`.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("runlog").join(DEFAULT_CONFIG_FILE));
    }
    candidates
}

/// First candidate that exists as a file.
pub fn find_config_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("API key not set. Set RUNLOG_API_KEY (or SILICONFLOW_API_KEY) or api.api_key in the config file")]
    MissingApiKey,
}

/// Which text extraction backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Vision model behind the chat-completions endpoint.
    #[default]
    Remote,
    /// Local PaddleOCR engine, falling back to remote when unavailable.
    Local,
}

impl BackendPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "remote" | "vision" | "api" => Some(Self::Remote),
            "local" | "paddle" | "paddleocr" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Vision model used for OCR.
    #[serde(default = "default_ocr_model")]
    pub ocr_model: String,
    /// Chat model used for field extraction.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

fn default_ocr_model() -> String {
    "deepseek-ai/DeepSeek-OCR".to_string()
}

fn default_chat_model() -> String {
    "deepseek-ai/DeepSeek-R1-0528-Qwen3-8B".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            ocr_model: default_ocr_model(),
            chat_model: default_chat_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Text extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSettings {
    #[serde(default)]
    pub backend: BackendPreference,
    /// Directory holding the local engine's model files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
    /// Worker threads for the local engine.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_threads() -> usize {
    4
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            model_dir: None,
            threads: default_threads(),
        }
    }
}

/// Prompt templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Instruction sent with the screenshot.
    #[serde(default = "default_ocr_prompt")]
    pub ocr: String,
    /// Analysis template with `{text_content}` and `{json_format}` placeholders.
    #[serde(default = "default_analysis_prompt")]
    pub analysis: String,
    /// Example object substituted for `{json_format}`.
    #[serde(default = "default_json_format")]
    pub json_format: String,
}

fn default_ocr_prompt() -> String {
    DEFAULT_OCR_PROMPT.to_string()
}

fn default_analysis_prompt() -> String {
    DEFAULT_ANALYSIS_PROMPT.to_string()
}

fn default_json_format() -> String {
    DEFAULT_JSON_FORMAT.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            ocr: default_ocr_prompt(),
            analysis: default_analysis_prompt(),
            json_format: default_json_format(),
        }
    }
}

/// Pacing between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between the OCR request and the analysis request.
    #[serde(default = "default_stage_delay_ms")]
    pub stage_delay_ms: u64,
    /// Pause between images in a batch.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
}

fn default_stage_delay_ms() -> u64 {
    3000
}

fn default_pacing_delay_ms() -> u64 {
    2000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_delay_ms: default_stage_delay_ms(),
            pacing_delay_ms: default_pacing_delay_ms(),
        }
    }
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

fn default_screenshots_dir() -> PathBuf {
    PathBuf::from("data/screenshots")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("output/running_records.csv")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            screenshots_dir: default_screenshots_dir(),
            output_file: default_output_file(),
        }
    }
}

/// Complete runlog settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Settings {
    /// Load settings from `path`, or from the first discovered config file,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match find_config_file(&config_file_candidates()) {
                Some(found) => Self::from_file(&found)?,
                None => Self::default(),
            },
        };
        Ok(settings.with_env_overrides())
    }

    /// Parse a TOML config file without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `RUNLOG_API_KEY` (falls back to `SILICONFLOW_API_KEY`)
    /// - `RUNLOG_API_URL`: API base URL
    /// - `RUNLOG_OCR_MODEL`, `RUNLOG_CHAT_MODEL`: model identifiers
    /// - `RUNLOG_TIMEOUT_SECS`: request timeout
    /// - `RUNLOG_OCR_BACKEND`: "remote" or "local"
    /// - `RUNLOG_MODEL_DIR`: local OCR model directory
    /// - `RUNLOG_STAGE_DELAY_MS`, `RUNLOG_PACING_DELAY_MS`: request pacing
    /// - `RUNLOG_SCREENSHOTS_DIR`, `RUNLOG_OUTPUT_FILE`: paths
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        if let Some(key) =
            non_blank("RUNLOG_API_KEY").or_else(|| non_blank("SILICONFLOW_API_KEY"))
        {
            self.api.api_key = Some(key);
        }
        if let Some(val) = lookup("RUNLOG_API_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = lookup("RUNLOG_OCR_MODEL") {
            self.api.ocr_model = val;
        }
        if let Some(val) = lookup("RUNLOG_CHAT_MODEL") {
            self.api.chat_model = val;
        }
        if let Some(n) = lookup("RUNLOG_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.timeout_secs = n;
        }
        if let Some(backend) =
            lookup("RUNLOG_OCR_BACKEND").and_then(|v| BackendPreference::from_str(&v))
        {
            self.ocr.backend = backend;
        }
        if let Some(val) = lookup("RUNLOG_MODEL_DIR") {
            self.ocr.model_dir = Some(PathBuf::from(val));
        }
        if let Some(n) = lookup("RUNLOG_STAGE_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.pipeline.stage_delay_ms = n;
        }
        if let Some(n) = lookup("RUNLOG_PACING_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.pipeline.pacing_delay_ms = n;
        }
        if let Some(val) = lookup("RUNLOG_SCREENSHOTS_DIR") {
            self.paths.screenshots_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("RUNLOG_OUTPUT_FILE") {
            self.paths.output_file = PathBuf::from(val);
        }
        self
    }

    /// The API key, or an error explaining how to set it.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }
}

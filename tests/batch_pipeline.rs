//! Batch Pipeline Tests
//!
//! Drives the full stack (vision OCR, field extraction, CSV store) against a
//! scripted chat-completions endpoint.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};

use runlog::config::Settings;
use runlog::llm::{ChatClient, ChatTransport, TransportError, TransportResponse};
use runlog::ocr::{select_backend, ExtractionError};
use runlog::pipeline::{AnalysisPipeline, PipelineError};
use runlog::repository::RecordStore;
use runlog::services::{BatchRunner, ImageOutcome};

const OCR_TEXT: &str = "5.2km 00:28:30 5:29/km 312kcal 2024-03-01";

/// Answers by model: the OCR model gets `ocr`, the chat model gets `analysis`.
struct ScriptedEndpoint {
    ocr_model: String,
    ocr: (u16, String),
    analysis: (u16, String),
    ocr_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
}

impl ScriptedEndpoint {
    fn new(settings: &Settings, ocr: (u16, String), analysis: (u16, String)) -> Arc<Self> {
        Arc::new(Self {
            ocr_model: settings.api.ocr_model.clone(),
            ocr,
            analysis,
            ocr_calls: AtomicUsize::new(0),
            analysis_calls: AtomicUsize::new(0),
        })
    }

    fn total_calls(&self) -> usize {
        self.ocr_calls.load(Ordering::SeqCst) + self.analysis_calls.load(Ordering::SeqCst)
    }
}

impl ChatTransport for ScriptedEndpoint {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError> {
        assert!(url.ends_with("/chat/completions"));
        assert_eq!(bearer_token, "sk-test");

        let (status, reply) = if body["model"] == self.ocr_model.as_str() {
            self.ocr_calls.fetch_add(1, Ordering::SeqCst);
            &self.ocr
        } else {
            self.analysis_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(body["response_format"]["type"], "json_object");
            &self.analysis
        };
        Ok(TransportResponse::new(*status, reply.clone()))
    }
}

fn completion(content: &str) -> (u16, String) {
    (
        200,
        json!({"choices": [{"message": {"content": content}}]}).to_string(),
    )
}

fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.api.api_key = Some("sk-test".to_string());
    settings.pipeline.stage_delay_ms = 0;
    settings.pipeline.pacing_delay_ms = 0;
    settings.paths.screenshots_dir = root.join("screenshots");
    settings.paths.output_file = root.join("output").join("running_records.csv");
    settings
}

fn build_runner(settings: &Settings, endpoint: Arc<ScriptedEndpoint>) -> BatchRunner {
    let client = ChatClient::new(&settings.api.base_url, "sk-test", endpoint);
    let backend = select_backend(settings, || Ok::<_, anyhow::Error>(client.clone())).unwrap();
    let pipeline = AnalysisPipeline::from_settings(settings, backend, client);
    BatchRunner::new(
        pipeline,
        RecordStore::new(&settings.paths.output_file),
        Duration::from_millis(settings.pipeline.pacing_delay_ms),
    )
}

fn write_screenshots(settings: &Settings, names: &[&str]) -> PathBuf {
    let dir = settings.paths.screenshots_dir.clone();
    std::fs::create_dir_all(&dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), [0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap();
    }
    dir
}

#[test]
fn test_batch_stores_each_screenshot_once() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let dir = write_screenshots(&settings, &["run1.jpg", "run2.png", "run2_processed.jpg"]);
    let endpoint = ScriptedEndpoint::new(
        &settings,
        completion(OCR_TEXT),
        completion(
            r#"{"date":"2024-03-01","distance_km":5.2,"duration":"00:28:30","pace":"5:29/km","calories":312}"#,
        ),
    );
    let runner = build_runner(&settings, endpoint.clone());

    let summary = runner.run(&dir, |_| {}).unwrap();
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(endpoint.ocr_calls.load(Ordering::SeqCst), 2);
    assert_eq!(endpoint.analysis_calls.load(Ordering::SeqCst), 2);

    let rows = runner.store().load().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].image_file, "run1.jpg");
    assert_eq!(rows[1].image_file, "run2.png");
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(rows[0].distance_km, Some(5.2));
    assert_eq!(rows[0].duration.as_deref(), Some("00:28:30"));
    assert_eq!(rows[0].pace.as_deref(), Some("5:29/km"));
    assert_eq!(rows[0].calories, Some(312));

    // Second pass: everything is a duplicate and no requests are made.
    let summary = runner.run(&dir, |_| {}).unwrap();
    assert_eq!(summary.duplicates, 2);
    assert_eq!(endpoint.total_calls(), 4);
    assert_eq!(runner.store().load().unwrap().len(), 2);
}

#[test]
fn test_upstream_error_stores_nothing() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let dir = write_screenshots(&settings, &["run1.jpg"]);
    let endpoint = ScriptedEndpoint::new(
        &settings,
        (500, "internal error".to_string()),
        completion("{}"),
    );
    let runner = build_runner(&settings, endpoint.clone());

    let summary = runner.run(&dir, |_| {}).unwrap();
    assert_eq!(summary.failed, 1);
    assert!(matches!(
        summary.outcomes[0].1,
        ImageOutcome::Failed(PipelineError::ExtractionFailed(
            ExtractionError::UpstreamStatus(500)
        ))
    ));
    assert_eq!(endpoint.analysis_calls.load(Ordering::SeqCst), 0);
    assert!(runner.store().load().unwrap().is_empty());
}

#[test]
fn test_fenced_and_partial_response() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let dir = write_screenshots(&settings, &["run1.jpg"]);
    let endpoint = ScriptedEndpoint::new(
        &settings,
        completion(OCR_TEXT),
        completion(
            "Here you go:\n```json\n{\"distance_km\": \"10.01 km\", \"calories\": null}\n```",
        ),
    );
    let runner = build_runner(&settings, endpoint);

    let summary = runner.run(&dir, |_| {}).unwrap();
    match &summary.outcomes[0].1 {
        ImageOutcome::Stored(record) => {
            assert_eq!(record.distance_km, Some(10.01));
            assert_eq!(record.calories, None);
            assert_eq!(record.date, None);
        }
        other => panic!("expected stored record, got {:?}", other),
    }

    let content = std::fs::read_to_string(&settings.paths.output_file).unwrap();
    assert_eq!(content.lines().nth(1), Some("run1.jpg,10.01,,,,"));
}

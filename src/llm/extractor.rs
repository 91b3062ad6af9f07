//! Prompt-driven extraction of workout fields from OCR text.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use super::client::{ChatClient, ChatError, ChatRequest};
use super::recovery::{recover_json, RecoveryError};
use crate::config::PromptConfig;
use crate::models::WorkoutRecord;

/// Errors from the interpretation stage.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis endpoint returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("Unparseable model response: {0}")]
    UnparseableResponse(#[from] RecoveryError),

    #[error("Analysis request failed: {0}")]
    TransportFailure(String),

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),
}

impl From<ChatError> for AnalysisError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Transport(msg) => AnalysisError::TransportFailure(msg),
            ChatError::Status { code, .. } => AnalysisError::UpstreamStatus(code),
            ChatError::Malformed(msg) => AnalysisError::MalformedResponse(msg),
        }
    }
}

/// Turns OCR text into a workout record.
pub trait FieldExtractor: Send + Sync {
    fn extract_fields(&self, text: &str) -> Result<WorkoutRecord, AnalysisError>;
}

/// Field extractor backed by a chat model in JSON-object mode.
pub struct StructuredFieldExtractor {
    client: ChatClient,
    model: String,
    analysis_prompt: String,
    json_format: String,
}

impl StructuredFieldExtractor {
    pub fn new(client: ChatClient, model: impl Into<String>, prompts: &PromptConfig) -> Self {
        Self {
            client,
            model: model.into(),
            analysis_prompt: prompts.analysis.clone(),
            json_format: prompts.json_format.clone(),
        }
    }

    /// Fill the prompt template. Plain replacement, so braces in OCR text are inert.
    pub fn build_prompt(&self, text: &str) -> String {
        self.analysis_prompt
            .replace("{json_format}", &self.json_format)
            .replace("{text_content}", text)
    }
}

impl FieldExtractor for StructuredFieldExtractor {
    fn extract_fields(&self, text: &str) -> Result<WorkoutRecord, AnalysisError> {
        let request = ChatRequest::text(&self.model, self.build_prompt(text)).json_object();

        info!("Sending analysis request (model: {})", self.model);
        let content = self.client.complete(&request)?;
        debug!("Analysis response: {}", content);

        let object = recover_json(&content)?;
        let record = coerce_record(&object);
        info!(
            "Extracted {} of 5 workout fields",
            record.populated_fields()
        );
        Ok(record)
    }
}

/// Coerce a recovered object into a record. Keys that are missing, null or of
/// an unusable shape become `None`; they never become zero or empty.
pub fn coerce_record(object: &Map<String, Value>) -> WorkoutRecord {
    WorkoutRecord {
        date: field(object, "date").and_then(coerce_date),
        distance_km: field(object, "distance_km").and_then(coerce_distance),
        duration: field(object, "duration").and_then(coerce_text),
        pace: field(object, "pace").and_then(coerce_text),
        calories: field(object, "calories").and_then(coerce_calories),
    }
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match object.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let parsed = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok());
    if parsed.is_none() {
        debug!("Ignoring unparseable date: {:?}", text);
    }
    parsed
}

fn coerce_distance(value: &Value) -> Option<f64> {
    let distance = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_with_unit(s, &["km", "公里"]),
        _ => None,
    }?;
    if distance.is_finite() && distance >= 0.0 {
        Some(distance)
    } else {
        debug!("Ignoring out-of-range distance: {}", distance);
        None
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn coerce_calories(value: &Value) -> Option<u64> {
    let calories = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_non_negative)),
        Value::String(s) => {
            parse_number_with_unit(s, &["kcal", "千卡", "cal"]).and_then(whole_non_negative)
        }
        _ => None,
    };
    if calories.is_none() {
        debug!("Ignoring unusable calories value: {}", value);
    }
    calories
}

fn whole_non_negative(n: f64) -> Option<u64> {
    if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n < u64::MAX as f64 {
        Some(n as u64)
    } else {
        None
    }
}

/// Parse "5.2", "5.2 km" or "312kcal" style strings.
fn parse_number_with_unit(text: &str, units: &[&str]) -> Option<f64> {
    let mut trimmed = text.trim();
    for unit in units {
        if let Some(stripped) = trimmed.strip_suffix(unit) {
            trimmed = stripped.trim_end();
            break;
        }
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{ChatTransport, TransportError, TransportResponse};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    struct FixedTransport {
        status: u16,
        content: Option<String>,
        bodies: Mutex<Vec<Value>>,
    }

    impl FixedTransport {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                status: 200,
                content: Some(content.to_string()),
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                content: None,
                bodies: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChatTransport for FixedTransport {
        fn post_json(
            &self,
            _url: &str,
            _bearer_token: &str,
            body: &Value,
        ) -> Result<TransportResponse, TransportError> {
            self.bodies.lock().unwrap().push(body.clone());
            let body = match &self.content {
                Some(content) => {
                    json!({"choices": [{"message": {"content": content}}]}).to_string()
                }
                None => "internal error".to_string(),
            };
            Ok(TransportResponse::new(self.status, body))
        }
    }

    fn extractor(transport: Arc<FixedTransport>) -> StructuredFieldExtractor {
        let client = ChatClient::new("https://api.example.com/v1", "sk-test", transport);
        StructuredFieldExtractor::new(client, "chat-model", &PromptConfig::default())
    }

    #[test]
    fn test_coerce_full_record() {
        let record = coerce_record(&object(json!({
            "date": "2024-03-01",
            "distance_km": 5.2,
            "duration": "00:28:30",
            "pace": "5:29/km",
            "calories": 312
        })));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.distance_km, Some(5.2));
        assert_eq!(record.duration.as_deref(), Some("00:28:30"));
        assert_eq!(record.pace.as_deref(), Some("5:29/km"));
        assert_eq!(record.calories, Some(312));
    }

    #[test]
    fn test_missing_and_null_fields_stay_absent() {
        let record = coerce_record(&object(json!({
            "distance_km": null,
            "duration": "",
            "unrelated": 42
        })));
        assert_eq!(record, WorkoutRecord::default());
    }

    #[test]
    fn test_calories_beyond_u64_are_absent() {
        // u64::MAX rounds up to 2^64 as f64, which no u64 can hold.
        let record = coerce_record(&object(json!({"calories": 1.8446744073709552e19})));
        assert_eq!(record.calories, None);

        let record = coerce_record(&object(json!({"calories": "18446744073709551616kcal"})));
        assert_eq!(record.calories, None);
    }

    #[test]
    fn test_zero_is_not_absent() {
        let record = coerce_record(&object(json!({"calories": 0, "distance_km": 0})));
        assert_eq!(record.calories, Some(0));
        assert_eq!(record.distance_km, Some(0.0));
        assert!(record.date.is_none());
    }

    #[test]
    fn test_lenient_value_shapes() {
        let record = coerce_record(&object(json!({
            "date": "2024/03/01",
            "distance_km": "10.01 km",
            "calories": "645kcal",
            "pace": 6
        })));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.distance_km, Some(10.01));
        assert_eq!(record.calories, Some(645));
        assert_eq!(record.pace.as_deref(), Some("6"));

        let record = coerce_record(&object(json!({"calories": 312.0})));
        assert_eq!(record.calories, Some(312));
    }

    #[test]
    fn test_unusable_values_become_absent() {
        let record = coerce_record(&object(json!({
            "date": "YYYY-MM-DD",
            "distance_km": -3.0,
            "calories": 12.5,
            "duration": ["00:10:00"]
        })));
        assert_eq!(record, WorkoutRecord::default());
    }

    #[test]
    fn test_prompt_embeds_text_and_format() {
        let extractor = extractor(FixedTransport::replying("{}"));
        let prompt = extractor.build_prompt("5.2km {weird} 312kcal");
        assert!(prompt.contains("5.2km {weird} 312kcal"));
        assert!(prompt.contains("\"distance_km\": number"));
        assert!(!prompt.contains("{text_content}"));
        assert!(!prompt.contains("{json_format}"));
    }

    #[test]
    fn test_extract_requests_json_mode() {
        let transport = FixedTransport::replying("```json\n{\"calories\": 312}\n```");
        let record = extractor(transport.clone())
            .extract_fields("312kcal")
            .unwrap();
        assert_eq!(record.calories, Some(312));
        assert!(record.date.is_none());

        let bodies = transport.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["model"], "chat-model");
        assert_eq!(bodies[0]["response_format"]["type"], "json_object");
        assert!(bodies[0]["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("312kcal"));
    }

    #[test]
    fn test_upstream_status() {
        let err = extractor(FixedTransport::failing(429))
            .extract_fields("text")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamStatus(429)));
    }

    #[test]
    fn test_unparseable_response() {
        let err = extractor(FixedTransport::replying("I could not find any run data."))
            .extract_fields("text")
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnparseableResponse(RecoveryError::NoJsonFound)
        ));
    }
}

//! Chat-completions client shared by the vision OCR backend and the field extractor.
//!
//! Speaks the OpenAI-compatible `/chat/completions` shape (SiliconFlow, Groq,
//! OpenAI, ...). The wire transport is a trait so tests can script responses
//! without a network.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Maximum number of response-body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 500;

/// Errors from a chat-completions call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("Connection error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-2xx status.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body is not the expected `{choices: [{message: {content}}]}` envelope.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failure at the transport layer.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Raw HTTP response as seen by the client.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking JSON POST with bearer authentication.
pub trait ChatTransport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by `reqwest::blocking`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ChatTransport for ReqwestTransport {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .json(body)
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| TransportError(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Plain text or a multimodal content list.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

impl ChatRequest {
    /// Single user message with plain text content.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Text(prompt.into()),
            }],
            response_format: None,
        }
    }

    /// Single user message carrying an instruction and an image data URL.
    pub fn with_image(
        model: impl Into<String>,
        prompt: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: prompt.into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_url.into(),
                        },
                    },
                ]),
            }],
            response_format: None,
        }
    }

    /// Ask the endpoint for JSON-object response mode.
    pub fn json_object(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for one chat-completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    endpoint: String,
    api_key: String,
    transport: Arc<dyn ChatTransport>,
}

impl ChatClient {
    /// Create a client for `base_url` (e.g. `https://api.siliconflow.cn/v1`).
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            transport,
        }
    }

    /// Create a client with the reqwest transport from API settings.
    pub fn from_config(api: &ApiConfig, api_key: &str) -> Result<Self, ChatError> {
        let transport = ReqwestTransport::new(Duration::from_secs(api.timeout_secs))
            .map_err(|e| ChatError::Transport(e.0))?;
        Ok(Self::new(&api.base_url, api_key, Arc::new(transport)))
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request and return the first choice's message content verbatim.
    pub fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ChatError::Malformed(format!("Failed to encode request: {}", e)))?;

        debug!("Sending chat request to {} (model: {})", self.endpoint, request.model);
        let resp = self
            .transport
            .post_json(&self.endpoint, &self.api_key, &body)
            .map_err(|e| ChatError::Transport(e.0))?;

        if !resp.is_success() {
            let body = truncate_chars(&resp.body, ERROR_BODY_LIMIT);
            warn!("Chat request failed: HTTP {} - {}", resp.status, body);
            return Err(ChatError::Status {
                code: resp.status,
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&resp.body)
            .map_err(|e| ChatError::Malformed(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ChatError::Malformed("missing choices[0].message.content".to_string()))
    }
}

/// Truncate to at most `max` characters (UTF-8 safe).
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        response: Result<TransportResponse, String>,
        seen: Mutex<Vec<(String, String, Value)>>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                response: Ok(TransportResponse::new(status, body)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatTransport for RecordingTransport {
        fn post_json(
            &self,
            url: &str,
            bearer_token: &str,
            body: &Value,
        ) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push((
                url.to_string(),
                bearer_token.to_string(),
                body.clone(),
            ));
            self.response.clone().map_err(TransportError)
        }
    }

    fn client_with(transport: Arc<RecordingTransport>) -> ChatClient {
        ChatClient::new("https://api.example.com/v1/", "sk-test", transport)
    }

    #[test]
    fn test_complete_returns_first_choice() {
        let transport = Arc::new(RecordingTransport::replying(
            200,
            r#"{"choices":[{"message":{"content":"first"}},{"message":{"content":"second"}}]}"#,
        ));
        let client = client_with(transport.clone());

        let content = client.complete(&ChatRequest::text("m", "hi")).unwrap();
        assert_eq!(content, "first");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].0, "https://api.example.com/v1/chat/completions");
        assert_eq!(seen[0].1, "sk-test");
        assert_eq!(seen[0].2["messages"][0]["content"], "hi");
        assert!(seen[0].2.get("response_format").is_none());
    }

    #[test]
    fn test_status_error() {
        let transport = Arc::new(RecordingTransport::replying(503, "overloaded"));
        let err = client_with(transport)
            .complete(&ChatRequest::text("m", "hi"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Status { code: 503, ref body } if body == "overloaded"));
    }

    #[test]
    fn test_missing_choices_is_malformed() {
        let transport = Arc::new(RecordingTransport::replying(200, r#"{"choices":[]}"#));
        let err = client_with(transport)
            .complete(&ChatRequest::text("m", "hi"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Malformed(_)));

        let transport = Arc::new(RecordingTransport::replying(200, "<html>gateway</html>"));
        let err = client_with(transport)
            .complete(&ChatRequest::text("m", "hi"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Malformed(_)));
    }

    #[test]
    fn test_transport_error() {
        let transport = Arc::new(RecordingTransport {
            response: Err("connection refused".to_string()),
            seen: Mutex::new(Vec::new()),
        });
        let err = client_with(transport)
            .complete(&ChatRequest::text("m", "hi"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Transport(ref msg) if msg == "connection refused"));
    }

    #[test]
    fn test_multimodal_request_shape() {
        let request = ChatRequest::with_image("vision", "describe", "data:image/png;base64,AAAA")
            .json_object();
        let body = serde_json::to_value(&request).unwrap();

        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "describe");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("配速配速配速", 2), "配速...");
    }
}

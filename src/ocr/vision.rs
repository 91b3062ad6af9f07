//! Vision-model OCR backend.
//!
//! Sends the screenshot as a base64 data URL to a vision-capable model behind
//! the OpenAI-compatible chat-completions endpoint and returns the model's
//! description verbatim. One request per image, no retries.

use std::path::Path;
use std::time::Instant;

use base64::Engine;
use tracing::{debug, info};

use super::backend::{build_ocr_result, ExtractionError, OcrBackend, OcrBackendType, OcrResult};
use crate::config::Settings;
use crate::llm::{ChatClient, ChatRequest};
use crate::utils::mime::image_mime_type;

/// Remote vision OCR backend.
pub struct VisionBackend {
    client: ChatClient,
    model: String,
    prompt: String,
}

impl VisionBackend {
    pub fn new(client: ChatClient, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    /// Create a backend using the configured OCR model and prompt.
    pub fn from_settings(client: ChatClient, settings: &Settings) -> Self {
        Self::new(client, &settings.api.ocr_model, &settings.prompts.ocr)
    }

    /// Read an image file and encode it as a `data:<mime>;base64,...` URL.
    pub fn encode_image(image_path: &Path) -> Result<String, ExtractionError> {
        let image_bytes =
            std::fs::read(image_path).map_err(|source| ExtractionError::ImageUnreadable {
                path: image_path.to_path_buf(),
                source,
            })?;
        let mime_type = image_mime_type(image_path, &image_bytes);
        let base64_data = base64::engine::general_purpose::STANDARD.encode(&image_bytes);
        info!("Image encoded, {} base64 characters", base64_data.len());

        Ok(format!("data:{};base64,{}", mime_type, base64_data))
    }
}

impl OcrBackend for VisionBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Vision
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        format!(
            "Vision OCR via {} (model: {})",
            self.client.endpoint(),
            self.model
        )
    }

    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, ExtractionError> {
        let start = Instant::now();
        let data_url = Self::encode_image(image_path)?;
        let request = ChatRequest::with_image(&self.model, &self.prompt, data_url);

        info!("Sending OCR request (model: {})", self.model);
        let text = self.client.complete(&request)?;
        info!("OCR succeeded, {} characters", text.chars().count());
        debug!("OCR text: {}", text);

        Ok(build_ocr_result(
            text,
            OcrBackendType::Vision,
            Some(self.model.clone()),
            start,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatTransport, TransportError, TransportResponse};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct ScriptedTransport {
        status: u16,
        body: String,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        fn new(status: u16, body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.into(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChatTransport for ScriptedTransport {
        fn post_json(
            &self,
            _url: &str,
            _bearer_token: &str,
            body: &Value,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(body.clone());
            Ok(TransportResponse::new(self.status, self.body.clone()))
        }
    }

    fn backend(transport: Arc<ScriptedTransport>) -> VisionBackend {
        let client = ChatClient::new("https://api.example.com/v1", "sk-test", transport);
        VisionBackend::new(client, "ocr-model", "Describe the contents of the image.")
    }

    fn write_png(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("run.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        path
    }

    #[test]
    fn test_returns_message_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(&dir);
        let reply = json!({"choices": [{"message": {"content": "  5.2km\n00:28:30  "}}]});
        let transport = ScriptedTransport::new(200, reply.to_string());

        let result = backend(transport.clone()).ocr_image(&image).unwrap();
        assert_eq!(result.text, "  5.2km\n00:28:30  ");
        assert_eq!(result.backend, OcrBackendType::Vision);
        assert_eq!(result.model.as_deref(), Some("ocr-model"));

        let requests = transport.requests.lock().unwrap();
        let content = &requests[0]["messages"][0]["content"];
        assert_eq!(requests[0]["model"], "ocr-model");
        assert_eq!(content[0]["text"], "Describe the contents of the image.");
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(requests[0].get("response_format").is_none());
    }

    #[test]
    fn test_upstream_status() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(&dir);
        let err = backend(ScriptedTransport::new(500, "server error"))
            .ocr_image(&image)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UpstreamStatus(500)));
    }

    #[test]
    fn test_malformed_response() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(&dir);
        let err = backend(ScriptedTransport::new(200, r#"{"data": []}"#))
            .ocr_image(&image)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_image_makes_no_request() {
        let transport = ScriptedTransport::new(200, "{}");
        let err = backend(transport.clone())
            .ocr_image(Path::new("/nonexistent/run.png"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ImageUnreadable { .. }));
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}

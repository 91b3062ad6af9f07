//! Backend and connectivity check.

use console::style;

use super::helpers::chat_client;
use crate::config::Settings;
use crate::llm::{prompts::PING_PROMPT, ChatRequest};
use crate::ocr::{LocalOcrEngine, OcrBackend};

/// The remote backend needs nothing beyond an API key.
fn remote_vision_configured(settings: &Settings) -> bool {
    settings.api.api_key.is_some()
}

/// Report OCR backend status and send a trivial request to the chat endpoint.
pub fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("OCR Backends:").cyan());
    let remote = if remote_vision_configured(settings) {
        style("✓ configured").green()
    } else {
        style("✗ no API key").red()
    };
    println!(
        "  Remote vision: {} ({})",
        remote,
        style(&settings.api.ocr_model).dim()
    );

    let local = LocalOcrEngine::initialize(&settings.ocr);
    if local.is_available() {
        println!("  Local PaddleOCR: {}", style("✓ available").green());
    } else {
        println!("  Local PaddleOCR: {}", style("✗ not available").red());
        println!("    {}", style(local.availability_hint()).dim());
    }
    println!(
        "  Selected: {}",
        style(settings.ocr.backend.as_str()).bold()
    );

    println!("\n{}", style("API:").cyan());
    println!("  Endpoint: {}", settings.api.base_url);
    let client = match chat_client(settings) {
        Ok(client) => client,
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
            return Ok(());
        }
    };

    let request = ChatRequest::text(&settings.api.chat_model, PING_PROMPT);
    match client.complete(&request) {
        Ok(reply) => {
            println!("  {} Connected ({})", style("✓").green(), settings.api.chat_model);
            println!("  Reply: {}", reply.trim());
            Ok(())
        }
        Err(e) => {
            println!("  {} Request failed: {}", style("✗").red(), e);
            Err(e.into())
        }
    }
}

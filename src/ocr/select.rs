//! One-time backend selection.

use tracing::{info, warn};

use super::backend::OcrBackend;
use super::local::LocalOcrEngine;
use super::vision::VisionBackend;
use crate::config::{BackendPreference, Settings};
use crate::llm::ChatClient;

/// Pick the text extraction backend for a run.
///
/// A local preference initializes the local engine once; if it reports
/// unavailable, the remote backend is built instead. The remote constructor
/// is only invoked when it is actually used.
pub fn select_backend_with<L, R, E>(
    preference: BackendPreference,
    init_local: L,
    init_remote: R,
) -> Result<Box<dyn OcrBackend>, E>
where
    L: FnOnce() -> LocalOcrEngine,
    R: FnOnce() -> Result<VisionBackend, E>,
{
    if preference == BackendPreference::Local {
        let local = init_local();
        if local.is_available() {
            info!("Using local OCR engine");
            return Ok(Box::new(local));
        }
        warn!(
            "{}, falling back to remote vision OCR",
            local.availability_hint()
        );
    }

    let remote = init_remote()?;
    info!("Using remote vision OCR");
    Ok(Box::new(remote))
}

/// Pick the backend from settings. The client is built lazily, so a local
/// run needs no API key.
pub fn select_backend<F, E>(settings: &Settings, client: F) -> Result<Box<dyn OcrBackend>, E>
where
    F: FnOnce() -> Result<ChatClient, E>,
{
    select_backend_with(
        settings.ocr.backend,
        || LocalOcrEngine::initialize(&settings.ocr),
        || client().map(|client| VisionBackend::from_settings(client, settings)),
    )
}

//! Image MIME detection for data URLs.

use std::path::Path;

/// Detect the MIME type of an image from its content, falling back to the
/// file extension and finally to JPEG.
pub fn image_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.mime_type();
        }
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Whether a file name has one of the screenshot extensions we process.
pub fn is_supported_screenshot(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    [".png", ".jpg", ".jpeg"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

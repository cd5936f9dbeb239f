use image::ImageFormat;
use std::path::Path;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Sniff an image MIME type from magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

/// Content type a browser would declare for a local file: extension first,
/// then magic bytes.
pub fn declared_content_type(path: &Path, bytes: &[u8]) -> String {
    if let Ok(format) = ImageFormat::from_path(path) {
        return format.to_mime_type().to_string();
    }

    match detect_image_mime(bytes) {
        Some(mime) => mime.to_string(),
        None => {
            tracing::warn!(
                "Unrecognized file type for {} (first 4 bytes: {:02X?})",
                path.display(),
                &bytes[..bytes.len().min(4)]
            );
            FALLBACK_CONTENT_TYPE.to_string()
        }
    }
}

use crate::session::*;

use std::path::Path;

/// Output value printing the report on the standard output.
pub const STDOUT: &str = "stdout";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The lower-cased extension, or "" when there is none.
pub fn file_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

pub fn mime_type_for(path: &str) -> &'static str {
    match file_extension(path).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "txt" | "text" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Relative paths of a configuration file are relative to its directory.
pub fn resolve_path(root: Option<&Path>, file_path: &str) -> String {
    match root {
        Some(r) => r.join(file_path).display().to_string(),
        None => file_path.to_string(),
    }
}

/// Reads an image (or a text export) into a payload for the extractor.
pub fn read_payload(path: &str) -> SessionResult<ImagePayload> {
    let bytes = fs::read(path).context(ReadingImageSnafu { path })?;
    let mime_type = mime_type_for(path);
    debug!(
        "read_payload: {}: {} bytes of {}",
        simplify_file_name(path),
        bytes.len(),
        mime_type
    );
    Ok(ImagePayload::from_bytes(mime_type, &bytes))
}

//! Naming and validation for uploaded product images.

use tingo_core::{DomainError, DomainResult, ProductId};

const FALLBACK_EXTENSION: &str = "jpg";

/// Reject uploads whose declared content type is not an image.
pub fn ensure_image_content_type(content_type: Option<&str>) -> DomainResult<()> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
        _ => Err(DomainError::validation("file must be an image")),
    }
}

/// Lowercased extension of `filename`, `jpg` when there is none.
pub fn extension_of(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.trim())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Storage key for an upload: `{product_id}/{unique}.{ext}`.
pub fn image_object_key(product: &ProductId, unique: &str, filename: Option<&str>) -> String {
    format!("{product}/{unique}.{}", extension_of(filename))
}

/// Content type stored alongside the object.
pub fn stored_content_type(filename: Option<&str>) -> String {
    match extension_of(filename).as_str() {
        "jpg" => "image/jpeg".to_string(),
        "svg" => "image/svg+xml".to_string(),
        ext => format!("image/{ext}"),
    }
}

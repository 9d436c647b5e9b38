//! API utility functions
//!
//! Pure helpers for request inspection, kept separate so they can be unit
//! tested without a router.

use axum::http::{HeaderMap, Method, header};

/// Returns the raw `Content-Type` value if it is `multipart/form-data`.
///
/// Accepts parameters (`boundary`, `charset`) and any letter case; rejects
/// other multipart subtypes such as `multipart/mixed`.
pub fn multipart_content_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let media_type: mime::Mime = raw.parse().ok()?;

    (media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA)
        .then(|| raw.to_string())
}

/// Methods whose requests never carry a form body.
pub fn is_bodyless(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

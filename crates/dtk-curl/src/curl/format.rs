//! JSON pretty-printing for response bodies and the standalone formatter.

use crate::curl::types::*;

/// Re-indent a JSON document with two-space indentation.
///
/// Object keys come out sorted.
pub fn format_json(input: &str) -> Result<String, CurlError> {
    if input.trim().is_empty() {
        return Err(CurlError::new(CurlErrorKind::InvalidJson, "no JSON to format"));
    }
    let value: serde_json::Value = serde_json::from_str(input).map_err(|e| {
        CurlError::new(CurlErrorKind::InvalidJson, "invalid JSON").with_detail(e.to_string())
    })?;
    serde_json::to_string_pretty(&value).map_err(|e| {
        CurlError::new(CurlErrorKind::InvalidJson, "JSON could not be re-serialised")
            .with_detail(e.to_string())
    })
}

/// `application/json` or any `+json` media type, parameters ignored.
pub fn is_json_content_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media == "application/json" || media.ends_with("+json")
}

//! Dispatching parsed requests with `reqwest`.

use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};

use crate::curl::format;
use crate::curl::types::*;

impl ParsedRequest {
    /// Build a dispatchable request on `client`.
    pub fn into_request(self, client: &Client) -> Result<RequestBuilder, CurlError> {
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|e| {
            CurlError::new(CurlErrorKind::InvalidMethod, "method rejected by HTTP client")
                .with_detail(format!("{}: {}", self.method, e))
        })?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for entry in &self.headers {
            let name = HeaderName::from_bytes(entry.name.as_bytes()).map_err(|e| {
                CurlError::new(CurlErrorKind::InvalidHeader, "invalid header name")
                    .with_detail(format!("{}: {}", entry.name, e))
            })?;
            let value = HeaderValue::from_str(&entry.value).map_err(|e| {
                CurlError::new(CurlErrorKind::InvalidHeader, "invalid header value")
                    .with_detail(format!("{}: {}", entry.name, e))
            })?;
            headers.append(name, value);
        }

        let mut builder = client.request(method, self.url.as_str()).headers(headers);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        Ok(builder)
    }
}

/// Send `parsed` and summarise the response. JSON bodies are pretty-printed;
/// a body that claims to be JSON but does not parse is returned as received.
pub async fn dispatch(client: &Client, parsed: &ParsedRequest) -> Result<ResponseSummary, CurlError> {
    let request = parsed.clone().into_request(client)?;
    let started = Instant::now();

    let response = request.send().await.map_err(|e| {
        log::warn!("{} {} failed: {}", parsed.method, parsed.url, e);
        CurlError::new(CurlErrorKind::RequestFailed, "request failed").with_detail(e.to_string())
    })?;

    let status = response.status();
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, format::is_json_content_type);
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            HeaderEntry::new(name.as_str(), String::from_utf8_lossy(value.as_bytes()))
        })
        .collect();

    let body = response.text().await.map_err(|e| {
        CurlError::new(CurlErrorKind::RequestFailed, "failed to read response body")
            .with_detail(e.to_string())
    })?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let body = if is_json {
        match format::format_json(&body) {
            Ok(pretty) => pretty,
            Err(e) => {
                log::debug!("JSON response body left as received: {}", e);
                body
            }
        }
    } else {
        body
    };

    log::info!(
        "{} {} -> {} ({} bytes, {} ms)",
        parsed.method,
        parsed.url,
        status.as_u16(),
        body.len(),
        elapsed_ms
    );

    Ok(ResponseSummary {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
        elapsed_ms,
    })
}

//! Host-level error type.

use std::fmt;

use dtk_curl::curl::CurlError;
use dtk_totp::totp::TotpError;

/// Errors surfaced by the host.
#[derive(Debug)]
pub enum ToolkitError {
    /// Configuration file could not be read.
    Io(std::io::Error),
    /// Configuration is malformed or out of range.
    Config(String),
    /// HTTP client could not be built.
    Http(String),
    Totp(TotpError),
    Curl(CurlError),
}

impl fmt::Display for ToolkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Http(msg) => write!(f, "HTTP client error: {}", msg),
            Self::Totp(e) => write!(f, "Authenticator error: {}", e),
            Self::Curl(e) => write!(f, "Request error: {}", e),
        }
    }
}

impl std::error::Error for ToolkitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Totp(e) => Some(e),
            Self::Curl(e) => Some(e),
            Self::Config(_) | Self::Http(_) => None,
        }
    }
}

impl From<std::io::Error> for ToolkitError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ToolkitError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<reqwest::Error> for ToolkitError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<TotpError> for ToolkitError {
    fn from(e: TotpError) -> Self {
        Self::Totp(e)
    }
}

impl From<CurlError> for ToolkitError {
    fn from(e: CurlError) -> Self {
        Self::Curl(e)
    }
}

impl From<ToolkitError> for String {
    fn from(e: ToolkitError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtk_curl::curl::CurlErrorKind;
    use dtk_totp::totp::TotpErrorKind;
    use std::error::Error;

    #[test]
    fn wraps_crate_errors_with_source() {
        let err: ToolkitError = TotpError::new(TotpErrorKind::MissingSecret, "secret is required").into();
        assert_eq!(
            err.to_string(),
            "Authenticator error: [MissingSecret] secret is required"
        );
        assert!(err.source().is_some());

        let err: ToolkitError = CurlError::new(CurlErrorKind::NotCurl, "not curl").into();
        assert!(matches!(err, ToolkitError::Curl(ref e) if e.kind == CurlErrorKind::NotCurl));
    }

    #[test]
    fn json_errors_are_config_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ToolkitError = json_err.into();
        assert!(matches!(err, ToolkitError::Config(_)));
        let s: String = err.into();
        assert!(s.starts_with("Configuration error"));
    }
}

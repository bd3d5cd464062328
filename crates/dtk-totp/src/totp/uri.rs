//! `otpauth://` URI parsing and generation per the Google Authenticator
//! key-URI format:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>
//!
//! Format: `otpauth://totp/ISSUER:ACCOUNT?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&period=30`
//!
//! Only time-based (`totp`) URIs are accepted.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::totp::secret::{decode_secret, encode_secret};
use crate::totp::types::*;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse an `otpauth://totp/...` URI into a validated [`OtpConfig`].
///
/// Checks run in a fixed order and the first failure is returned:
/// scheme/type, secret presence, secret encoding, digits, period, algorithm.
pub fn parse_otpauth_uri(uri: &str) -> Result<OtpConfig, TotpError> {
    let url = url::Url::parse(uri.trim()).map_err(|e| {
        TotpError::new(TotpErrorKind::InvalidUri, "invalid URI").with_detail(e.to_string())
    })?;

    if url.scheme() != "otpauth" {
        return Err(TotpError::new(
            TotpErrorKind::InvalidUri,
            format!("expected scheme 'otpauth', got '{}'", url.scheme()),
        ));
    }

    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("totp") => {}
        other => {
            return Err(TotpError::new(
                TotpErrorKind::InvalidUri,
                format!("unsupported OTP type: {:?}", other.unwrap_or_default()),
            ))
        }
    }

    // Path is "/ACCOUNT" or "/ISSUER:ACCOUNT"
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let label = percent_decode_str(path).decode_utf8_lossy();
    let (label_issuer, account) = match label.split_once(':') {
        Some((issuer, account)) => (issuer.trim().to_string(), account.trim().to_string()),
        None => (String::new(), label.trim().to_string()),
    };

    let mut secret = None;
    let mut param_issuer = None;
    let mut algorithm = None;
    let mut digits = None;
    let mut period = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(value.into_owned()),
            "issuer" => param_issuer = Some(value.into_owned()),
            "algorithm" => algorithm = Some(value.into_owned()),
            "digits" => digits = Some(value.into_owned()),
            "period" => period = Some(value.into_owned()),
            _ => {} // ignore unknown params
        }
    }

    let secret: String = secret
        .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TotpError::new(TotpErrorKind::MissingSecret, "missing secret"))?;

    let key = decode_secret(&secret)?;
    if key.is_empty() {
        return Err(TotpError::new(
            TotpErrorKind::InvalidSecretEncoding,
            "invalid Base32 secret",
        )
        .with_detail("secret decodes to zero bytes"));
    }

    let digits = match digits {
        None => DEFAULT_DIGITS,
        Some(raw) => raw
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|d| SUPPORTED_DIGITS.contains(d))
            .ok_or_else(|| {
                TotpError::new(TotpErrorKind::UnsupportedDigits, "unsupported digits")
                    .with_detail(format!("got {:?}, expected 6, 7 or 8", raw))
            })?,
    };

    let period = match period {
        None => DEFAULT_PERIOD,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                TotpError::new(TotpErrorKind::InvalidPeriod, "invalid period")
                    .with_detail(format!("got {:?}, expected a positive number of seconds", raw))
            })?,
    };

    let algorithm = match algorithm {
        None => Algorithm::default(),
        Some(raw) => Algorithm::from_uri_param(&raw).ok_or_else(|| {
            TotpError::new(TotpErrorKind::UnsupportedAlgorithm, "unsupported algorithm")
                .with_detail(format!("got {:?}", raw))
        })?,
    };

    // Prefer issuer from query param, then from the label prefix
    let issuer = param_issuer.unwrap_or(label_issuer);

    let config = OtpConfig::new(key, digits, period, algorithm)?
        .with_issuer(issuer)
        .with_account(account);
    log::debug!(
        "parsed otpauth URI for '{}' ({}, {} digits, {}s)",
        config.display_name(),
        config.algorithm(),
        config.digits(),
        config.period()
    );
    Ok(config)
}

/// Parse multiple URIs (one per line), skipping blanks and comments.
pub fn parse_otpauth_uris(text: &str) -> Vec<Result<OtpConfig, TotpError>> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_otpauth_uri)
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an `otpauth://totp/` URI from a config.
///
/// Default parameters (SHA1, 6 digits, 30s) are omitted.
pub fn build_otpauth_uri(config: &OtpConfig) -> String {
    let account = url_encode(config.account());
    let path = if config.issuer().is_empty() {
        account
    } else {
        format!("{}:{}", url_encode(config.issuer()), account)
    };

    let mut params = vec![format!("secret={}", encode_secret(config.secret()))];

    if !config.issuer().is_empty() {
        params.push(format!("issuer={}", url_encode(config.issuer())));
    }
    if config.algorithm() != Algorithm::Sha1 {
        params.push(format!("algorithm={}", config.algorithm().uri_name()));
    }
    if config.digits() != DEFAULT_DIGITS {
        params.push(format!("digits={}", config.digits()));
    }
    if config.period() != DEFAULT_PERIOD {
        params.push(format!("period={}", config.period()));
    }

    format!("otpauth://totp/{}?{}", path, params.join("&"))
}

fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

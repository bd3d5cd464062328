//! Core types for the TOTP authenticator.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Code length used when a provisioning URI does not specify one.
pub const DEFAULT_DIGITS: u8 = 6;
/// Time-step length in seconds used when a URI does not specify one.
pub const DEFAULT_PERIOD: u32 = 30;
/// Accepted code lengths.
pub const SUPPORTED_DIGITS: [u8; 3] = [6, 7, 8];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl Algorithm {
    /// Parse the `algorithm` query parameter (case-insensitive, exact names only).
    pub fn from_uri_param(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// URI-safe name for `otpauth://` parameters.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A validated TOTP configuration.
///
/// Fields are private: the only ways to obtain one are [`OtpConfig::new`] and
/// [`crate::totp::uri::parse_otpauth_uri`], both of which validate every
/// constrained field, so a partially valid config cannot exist.
#[derive(Clone)]
pub struct OtpConfig {
    secret: Zeroizing<Vec<u8>>,
    issuer: String,
    account: String,
    digits: u8,
    period: u32,
    algorithm: Algorithm,
}

impl OtpConfig {
    /// Build a config from raw key bytes.
    pub fn new(
        secret: Vec<u8>,
        digits: u8,
        period: u32,
        algorithm: Algorithm,
    ) -> Result<Self, TotpError> {
        if secret.is_empty() {
            return Err(TotpError::new(TotpErrorKind::MissingSecret, "missing secret"));
        }
        if !SUPPORTED_DIGITS.contains(&digits) {
            return Err(TotpError::new(
                TotpErrorKind::UnsupportedDigits,
                format!("unsupported digits: {}", digits),
            ));
        }
        if period == 0 {
            return Err(TotpError::new(TotpErrorKind::InvalidPeriod, "invalid period: 0"));
        }
        Ok(Self {
            secret: Zeroizing::new(secret),
            issuer: String::new(),
            account: String::new(),
            digits,
            period,
            algorithm,
        })
    }

    /// Builder: set issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Builder: set account name.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Raw key bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Issuer, empty when none was provided.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Display name: "Issuer (account)" or just "account".
    pub fn display_name(&self) -> String {
        if self.issuer.is_empty() {
            self.account.clone()
        } else if self.account.is_empty() {
            self.issuer.clone()
        } else {
            format!("{} ({})", self.issuer, self.account)
        }
    }
}

impl PartialEq for OtpConfig {
    fn eq(&self, other: &Self) -> bool {
        self.secret.as_slice() == other.secret.as_slice()
            && self.issuer == other.issuer
            && self.account == other.account
            && self.digits == other.digits
            && self.period == other.period
            && self.algorithm == other.algorithm
    }
}

impl Eq for OtpConfig {}

impl fmt::Debug for OtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("account", &self.account)
            .field("digits", &self.digits)
            .field("period", &self.period)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code frame
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A derived code with the timing info a presenter needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
    /// The OTP code string (e.g. "123456").
    pub code: String,
    /// Seconds until the code expires, in `1..=period`.
    pub remaining_seconds: u32,
    /// Total period in seconds.
    pub period: u32,
    /// Fraction of the period already elapsed, in `[0, 1)`.
    pub progress: f64,
    /// The time step used.
    pub counter: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of checking a user-supplied code against a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    /// How many time-steps off the match was (0 = exact).
    pub drift: i64,
    /// The time step that matched (if any).
    pub matched_counter: Option<u64>,
}

impl VerifyResult {
    pub(crate) fn invalid() -> Self {
        Self {
            valid: false,
            drift: 0,
            matched_counter: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Ticker configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Refresh ticker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerConfig {
    /// Interval between refreshes in milliseconds.
    pub interval_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl TickerConfig {
    pub fn validate(&self) -> Result<(), TotpError> {
        if self.interval_ms == 0 {
            return Err(TotpError::new(
                TotpErrorKind::InvalidTickerConfig,
                "ticker interval must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotpErrorKind {
    /// Wrong scheme, wrong OTP type, or not a URI at all.
    InvalidUri,
    MissingSecret,
    /// Secret contains characters outside the Base32 alphabet.
    InvalidSecretEncoding,
    UnsupportedDigits,
    InvalidPeriod,
    UnsupportedAlgorithm,
    /// The HMAC primitive could not produce a code.
    DerivationFailure,
    /// The clock could not be read (e.g. set before the Unix epoch).
    ClockUnavailable,
    /// The operation needs a loaded config.
    NotRunning,
    /// Host-supplied ticker settings are unusable.
    InvalidTickerConfig,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpError {
    pub kind: TotpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for TotpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for TotpError {}

impl TotpError {
    pub fn new(kind: TotpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<TotpError> for String {
    fn from(e: TotpError) -> String {
        e.to_string()
    }
}

//! Core OTP derivation: RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! HMAC-based One-Time Password with SHA-1, SHA-256 and SHA-512, time-step
//! calculation, code verification with a drift window, and display helpers.

use crate::totp::types::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> Result<String, TotpError> {
    let hmac_result = compute_hmac(key, &counter.to_be_bytes(), algo)?;
    truncate(&hmac_result, digits)
}

fn hmac_digest<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TotpError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| {
        TotpError::new(TotpErrorKind::DerivationFailure, "HMAC key rejected").with_detail(e.to_string())
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> Result<Vec<u8>, TotpError> {
    match algo {
        Algorithm::Sha1 => hmac_digest::<Hmac<Sha1>>(key, data),
        Algorithm::Sha256 => hmac_digest::<Hmac<Sha256>>(key, data),
        Algorithm::Sha512 => hmac_digest::<Hmac<Sha512>>(key, data),
    }
}

/// Dynamic truncation per RFC 4226 §5.3.
fn truncate(hmac_result: &[u8], digits: u8) -> Result<String, TotpError> {
    let short = || {
        TotpError::new(TotpErrorKind::DerivationFailure, "HMAC output too short for truncation")
    };
    let last = *hmac_result.last().ok_or_else(short)?;
    let offset = (last & 0x0f) as usize;
    let window = hmac_result.get(offset..offset + 4).ok_or_else(short)?;
    let binary = ((window[0] as u32 & 0x7f) << 24)
        | ((window[1] as u32) << 16)
        | ((window[2] as u32) << 8)
        | (window[3] as u32);
    let modulus = 10u32.pow(digits as u32);
    let code = binary % modulus;
    Ok(format!("{:0>width$}", code, width = digits as usize))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time steps (RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / period as u64
}

/// Seconds remaining until the step containing `unix_seconds` expires.
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = period as u64;
    (p - (unix_seconds % p)) as u32
}

/// Progress fraction (0.0 = fresh code, approaching 1.0 = about to expire).
pub fn progress_fraction_at(unix_seconds: u64, period: u32) -> f64 {
    let remaining = seconds_remaining_at(unix_seconds, period);
    (period - remaining) as f64 / period as f64
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP derivation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Derive the TOTP code for `config` at an explicit unix timestamp.
pub fn derive_code(config: &OtpConfig, unix_seconds: u64) -> Result<String, TotpError> {
    let step = time_step_at(unix_seconds, config.period());
    hotp_raw(config.secret(), step, config.digits(), config.algorithm())
}

/// Derive a full [`CodeFrame`] (code plus countdown) at a unix timestamp.
pub fn derive_frame(config: &OtpConfig, unix_seconds: u64) -> Result<CodeFrame, TotpError> {
    let period = config.period();
    let step = time_step_at(unix_seconds, period);
    let code = hotp_raw(config.secret(), step, config.digits(), config.algorithm())?;
    Ok(CodeFrame {
        code,
        remaining_seconds: seconds_remaining_at(unix_seconds, period),
        period,
        progress: progress_fraction_at(unix_seconds, period),
        counter: step,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Verify a code against `config` at a specific timestamp.
///
/// `drift_window` is the number of time-steps checked on either side of the
/// current one (1 checks ±1).
pub fn verify_code_at(
    config: &OtpConfig,
    code: &str,
    drift_window: u32,
    unix_seconds: u64,
) -> Result<VerifyResult, TotpError> {
    if code.len() != config.digits() as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(VerifyResult::invalid());
    }

    let base_counter = time_step_at(unix_seconds, config.period());
    let start = base_counter.saturating_sub(drift_window as u64);
    let end = base_counter.saturating_add(drift_window as u64);

    for c in start..=end {
        let generated = hotp_raw(config.secret(), c, config.digits(), config.algorithm())?;
        if constant_time_eq(generated.as_bytes(), code.as_bytes()) {
            return Ok(VerifyResult {
                valid: true,
                drift: c as i64 - base_counter as i64,
                matched_counter: Some(c),
            });
        }
    }

    Ok(VerifyResult::invalid())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Utility helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Constant-time comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Format an OTP code with a space in the middle (e.g. "123 456").
///
/// Anything that is not a run of ASCII digits is returned unchanged.
pub fn format_code_display(code: &str) -> String {
    if code.len() <= 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return code.to_string();
    }
    let mid = code.len() / 2;
    format!("{} {}", &code[..mid], &code[mid..])
}

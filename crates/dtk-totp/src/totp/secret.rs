//! Base32 shared-secret handling (RFC 4648 alphabet, `A–Z2–7`).
//!
//! Decoding is strict: the input is uppercased and trailing `=` padding is
//! stripped, then every remaining character must belong to the alphabet.
//! Leftover bits that do not fill a whole byte are dropped.

use crate::totp::types::*;

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Decode a Base32 secret into raw key bytes.
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, TotpError> {
    let upper = b32.to_uppercase();
    let cleaned = upper.trim_end_matches('=');

    if let Some((pos, bad)) = cleaned
        .char_indices()
        .find(|(_, c)| !matches!(c, 'A'..='Z' | '2'..='7'))
    {
        return Err(
            TotpError::new(TotpErrorKind::InvalidSecretEncoding, "invalid Base32 secret")
                .with_detail(format!("unexpected character {:?} at offset {}", bad, pos)),
        );
    }

    base32::decode(ALPHABET, cleaned).ok_or_else(|| {
        TotpError::new(TotpErrorKind::InvalidSecretEncoding, "invalid Base32 secret")
    })
}

/// Encode raw bytes to Base32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(ALPHABET, bytes)
}

/// Check if a string is a non-empty, decodable Base32 secret.
pub fn is_valid_base32(s: &str) -> bool {
    matches!(decode_secret(s), Ok(bytes) if !bytes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Decoding ─────────────────────────────────────────────────

    #[test]
    fn decode_known_value() {
        // RFC 4648 §10 test vector.
        assert_eq!(decode_secret("MZXW6YTBOI======").unwrap(), b"foobar");
        assert_eq!(decode_secret("MZXW6YTBOI").unwrap(), b"foobar");
    }

    #[test]
    fn decode_rfc_shared_secret() {
        let bytes = decode_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
        assert_eq!(bytes, b"12345678901234567890");
    }

    #[test]
    fn decode_case_insensitive() {
        let upper = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        let lower = decode_secret("jbswy3dpehpk3pxp").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn decode_is_deterministic() {
        let a = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        let b = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decoded_length_follows_bit_count() {
        let symbols = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
        for n in 0..=40 {
            let input: String = symbols.chars().cycle().take(n).collect();
            let bytes = decode_secret(&input).unwrap();
            assert_eq!(bytes.len() * 8, (5 * n / 8) * 8, "length mismatch for n={}", n);
        }
    }

    #[test]
    fn padding_does_not_change_output() {
        let plain = decode_secret("JBSWY3DPEE").unwrap();
        let padded = decode_secret("JBSWY3DPEE======").unwrap();
        assert_eq!(plain, padded);
    }

    #[test]
    fn decode_rejects_non_alphabet() {
        for bad in ["JBSW0", "JBSW1", "JBSW8", "JBSW9", "JBSW-Y3DP", "JBSW Y3DP", "AB=CD", "!!!"] {
            let err = decode_secret(bad).unwrap_err();
            assert_eq!(err.kind, TotpErrorKind::InvalidSecretEncoding, "input {:?}", bad);
        }
    }

    #[test]
    fn decode_rejects_non_ascii() {
        let err = decode_secret("JBSWÄ").unwrap_err();
        assert_eq!(err.kind, TotpErrorKind::InvalidSecretEncoding);
    }

    // ── Encoding / validation ────────────────────────────────────

    #[test]
    fn encode_then_decode() {
        let original = b"hello world secret";
        let b32 = encode_secret(original);
        assert!(!b32.contains('='));
        assert_eq!(decode_secret(&b32).unwrap(), original);
    }

    #[test]
    fn is_valid_base32_check() {
        assert!(is_valid_base32("JBSWY3DPEHPK3PXP"));
        assert!(is_valid_base32("jbswy3dpehpk3pxp"));
        assert!(!is_valid_base32(""));
        assert!(!is_valid_base32("A"));
        assert!(!is_valid_base32("JBSW Y3DP"));
    }
}

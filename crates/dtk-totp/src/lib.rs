//! # DevToolkit – TOTP Authenticator
//!
//! Time-based one-time password engine behind the authenticator panel:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP derivation with SHA-1, SHA-256, SHA-512
//! - **otpauth:// URIs** – Parsing & generation per the Google Authenticator key-URI format
//! - **Base32 secrets** – Strict RFC 4648 decoding of shared secrets
//! - **Refresh ticker** – One self-correcting per-second ticker per engine, driving a
//!   pluggable presenter

pub mod totp;

//! Wall-clock source for code derivation.

use crate::totp::types::*;

/// Supplies the current unix time in whole seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> Result<u64, TotpError>;
}

/// Reads [`std::time::SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Result<u64, TotpError> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| {
                TotpError::new(TotpErrorKind::ClockUnavailable, "system clock is before the unix epoch")
                    .with_detail(e.to_string())
            })
    }
}

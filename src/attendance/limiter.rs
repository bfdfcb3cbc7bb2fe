//! Per-user throttle on QR scans

use std::num::NonZeroU32;
use std::sync::Arc;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;
use crate::utils::errors::{ScholarDeskError, Result};

/// Keyed by user id
#[derive(Clone)]
pub struct ScanLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<i64>>,
}

impl std::fmt::Debug for ScanLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLimiter").finish_non_exhaustive()
    }
}

impl ScanLimiter {
    pub fn per_minute(scans: u32) -> Self {
        let scans = NonZeroU32::new(scans).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(scans))),
        }
    }

    pub fn check(&self, user_id: i64) -> Result<()> {
        self.limiter.check_key(&user_id).map_err(|_| {
            warn!(user_id = user_id, "QR scan rate limit exceeded");
            ScholarDeskError::RateLimitExceeded
        })
    }

    /// Drop state for users whose quota has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_limits_each_user_separately() {
        let limiter = ScanLimiter::per_minute(2);
        assert!(limiter.check(1).is_ok());
        assert!(limiter.check(1).is_ok());
        assert_matches!(limiter.check(1), Err(ScholarDeskError::RateLimitExceeded));
        assert!(limiter.check(2).is_ok());
    }
}

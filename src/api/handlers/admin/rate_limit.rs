//! Database-backed failure counting for admin login attempts.
//!
//! Flow Overview:
//! 1) Every login or secret check appends a row to `admin_login_attempts`.
//! 2) Before the secret is examined, failures from the same origin inside the trailing
//!    window are counted.
//! 3) Once the count reaches the threshold the attempt is rejected (and still recorded).
//!
//! What happens when the count itself cannot be read is decided by `FailurePolicy`.

use chrono::{DateTime, Duration, Utc};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{error, warn};

use super::storage::AdminStore;

pub const DEFAULT_THRESHOLD: u32 = 5;
pub const DEFAULT_WINDOW_SECONDS: i64 = 15 * 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Allow the attempt when the counter is unavailable.
    #[default]
    Open,
    /// Reject the attempt when the counter is unavailable.
    Closed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("invalid rate limit policy: {other}")),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub threshold: u32,
    pub window: Duration,
    pub policy: FailurePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            window: Duration::seconds(DEFAULT_WINDOW_SECONDS),
            policy: FailurePolicy::Open,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[derive(Debug)]
pub struct LoginRateLimiter {
    store: Arc<dyn AdminStore>,
    config: RateLimitConfig,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn AdminStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub async fn check(&self, ip_address: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let Some(since) = now.checked_sub_signed(self.config.window) else {
            error!("Admin login window start out of range for {now}");
            return self.unavailable();
        };
        match self.store.count_failed_attempts(ip_address, since).await {
            Ok(failures) if failures >= i64::from(self.config.threshold) => {
                warn!(ip_address, failures, "Admin login rate limit reached");
                RateLimitDecision::Limited
            }
            Ok(_) => RateLimitDecision::Allowed,
            Err(err) => {
                error!("Failed to count admin login failures: {err:#}");
                self.unavailable()
            }
        }
    }

    fn unavailable(&self) -> RateLimitDecision {
        match self.config.policy {
            FailurePolicy::Open => RateLimitDecision::Allowed,
            FailurePolicy::Closed => RateLimitDecision::Limited,
        }
    }
}

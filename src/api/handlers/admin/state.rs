//! Admin auth configuration.

use anyhow::{anyhow, Result};
use chrono::Duration;
use secrecy::SecretString;

use super::rate_limit::{FailurePolicy, RateLimitConfig, DEFAULT_THRESHOLD, DEFAULT_WINDOW_SECONDS};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 60;

/// Upper bound for the session TTL and the rate-limit window (one year).
pub const MAX_DURATION_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AdminAuthConfig {
    admin_secret: SecretString,
    admin_identity: String,
    session_ttl_seconds: i64,
    rate_limit_threshold: u32,
    rate_limit_window_seconds: i64,
    rate_limit_policy: FailurePolicy,
    reaper_interval_seconds: u64,
}

fn bounded_seconds(name: &str, seconds: i64) -> Result<Duration> {
    if !(1..=MAX_DURATION_SECONDS).contains(&seconds) {
        return Err(anyhow!(
            "{name} must be between 1 and {MAX_DURATION_SECONDS} seconds, got {seconds}"
        ));
    }
    Duration::try_seconds(seconds).ok_or_else(|| anyhow!("{name} out of range: {seconds}"))
}

impl AdminAuthConfig {
    #[must_use]
    pub fn new(admin_secret: SecretString, admin_identity: String) -> Self {
        Self {
            admin_secret,
            admin_identity,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            rate_limit_threshold: DEFAULT_THRESHOLD,
            rate_limit_window_seconds: DEFAULT_WINDOW_SECONDS,
            rate_limit_policy: FailurePolicy::default(),
            reaper_interval_seconds: DEFAULT_REAPER_INTERVAL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_threshold(mut self, threshold: u32) -> Self {
        self.rate_limit_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: i64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_policy(mut self, policy: FailurePolicy) -> Self {
        self.rate_limit_policy = policy;
        self
    }

    #[must_use]
    pub fn with_reaper_interval_seconds(mut self, seconds: u64) -> Self {
        self.reaper_interval_seconds = seconds;
        self
    }

    pub(crate) fn admin_secret(&self) -> &SecretString {
        &self.admin_secret
    }

    #[must_use]
    pub fn admin_identity(&self) -> &str {
        &self.admin_identity
    }

    /// # Errors
    /// Returns an error if the TTL is not between 1 second and `MAX_DURATION_SECONDS`.
    pub fn session_ttl(&self) -> Result<Duration> {
        bounded_seconds("session TTL", self.session_ttl_seconds)
    }

    /// # Errors
    /// Returns an error if the window is not between 1 second and `MAX_DURATION_SECONDS`.
    pub fn rate_limit(&self) -> Result<RateLimitConfig> {
        Ok(RateLimitConfig {
            threshold: self.rate_limit_threshold,
            window: bounded_seconds("rate limit window", self.rate_limit_window_seconds)?,
            policy: self.rate_limit_policy,
        })
    }

    #[must_use]
    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reaper_interval_seconds)
    }
}

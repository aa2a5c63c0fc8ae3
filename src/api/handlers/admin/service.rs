//! Admin session lifecycle.
//!
//! Flow Overview:
//! 1) `login`: require a secret, consult the rate limiter, compare the secret, log the attempt,
//!    then persist a new session and only then hand the token back.
//! 2) `verify`: look up a live session by token hash and bump `last_used_at`.
//! 3) `logout`: delete the session row; unknown tokens are not an error.
//! 4) `cleanup`: delete every expired session (also run periodically by the reaper).
//!
//! Session states: absent -> active -> expired | revoked. Expired and revoked behave
//! exactly like absent.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    clock::Clock,
    error::AdminAuthError,
    rate_limit::{LoginRateLimiter, RateLimitDecision},
    secret::SecretValidator,
    state::AdminAuthConfig,
    storage::{AdminSession, AdminStore, LoginAttempt},
    utils::{generate_session_token, hash_session_token, non_blank, non_empty},
};

const SECRET_REQUIRED: &str = "Secret required";
const SESSION_TOKEN_REQUIRED: &str = "Session token required";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_SESSION: &str = "Invalid or expired session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedSession {
    #[must_use]
    pub fn expires_at_rfc3339(&self) -> String {
        self.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Where a login or secret check came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct AdminAuthService {
    config: AdminAuthConfig,
    session_ttl: Duration,
    validator: SecretValidator,
    limiter: LoginRateLimiter,
    store: Arc<dyn AdminStore>,
    clock: Arc<dyn Clock>,
}

impl AdminAuthService {
    /// # Errors
    /// Returns an error if the configured admin secret is empty, or the session TTL or
    /// rate-limit window is out of range.
    pub fn new(
        config: AdminAuthConfig,
        store: Arc<dyn AdminStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let validator = SecretValidator::new(config.admin_secret().clone())?;
        let session_ttl = config.session_ttl()?;
        let limiter = LoginRateLimiter::new(store.clone(), config.rate_limit()?);
        Ok(Self {
            config,
            session_ttl,
            validator,
            limiter,
            store,
            clock,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminAuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AdminStore> {
        &self.store
    }

    /// Exchange the admin secret for a new session.
    ///
    /// # Errors
    /// `Validation` when the secret is missing, `RateLimited` when the origin has too many
    /// recent failures, `Auth` on a wrong secret, `Internal` if the session cannot be stored.
    pub async fn login(
        &self,
        origin: &RequestOrigin,
        secret: Option<&str>,
    ) -> Result<IssuedSession, AdminAuthError> {
        let secret = non_empty(secret).ok_or(AdminAuthError::Validation(SECRET_REQUIRED))?;

        let valid = self.check_secret(origin, secret).await?;
        if !valid {
            return Err(AdminAuthError::Auth(INVALID_CREDENTIALS));
        }

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| anyhow!("session expiry out of range for {now}"))?;
        let token = generate_session_token(now)?;
        let session = AdminSession {
            id: Uuid::new_v4(),
            token_hash: hash_session_token(&token),
            user_identity: self.config.admin_identity().to_string(),
            created_at: now,
            expires_at,
            last_used_at: None,
            ip_address: origin.ip_address.clone(),
            user_agent: origin.user_agent.clone(),
        };

        // The token leaves this function only once the row is committed.
        self.store.insert_session(&session).await?;

        info!(ip_address = %origin.ip_address, "Admin session issued");

        Ok(IssuedSession {
            token,
            expires_at: session.expires_at,
        })
    }

    /// Rate-limited secret comparison with attempt logging, shared by login and the
    /// standalone validation endpoint.
    ///
    /// # Errors
    /// `RateLimited` when the origin has reached the failure threshold.
    pub async fn check_secret(
        &self,
        origin: &RequestOrigin,
        secret: &str,
    ) -> Result<bool, AdminAuthError> {
        let now = self.clock.now();

        if self.limiter.check(&origin.ip_address, now).await == RateLimitDecision::Limited {
            self.record_attempt(origin, false, now).await;
            return Err(AdminAuthError::RateLimited);
        }

        let valid = self.validator.matches(secret);
        self.record_attempt(origin, valid, now).await;

        if !valid {
            warn!(ip_address = %origin.ip_address, "Admin secret rejected");
        }
        Ok(valid)
    }

    /// Resolve a session token to the admin identity that owns it.
    ///
    /// # Errors
    /// `Validation` when the token is missing, `Auth` when it is unknown, expired or revoked.
    pub async fn verify(&self, token: Option<&str>) -> Result<String, AdminAuthError> {
        let token = non_blank(token).ok_or(AdminAuthError::Validation(SESSION_TOKEN_REQUIRED))?;
        let now = self.clock.now();
        let owner = self
            .store
            .touch_session(&hash_session_token(token.trim()), now)
            .await?;
        owner.ok_or(AdminAuthError::Auth(INVALID_SESSION))
    }

    /// Revoke a session. Revoking an unknown token succeeds.
    ///
    /// # Errors
    /// `Validation` when the token is missing, `Internal` if the store fails.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AdminAuthError> {
        let token = non_blank(token).ok_or(AdminAuthError::Validation(SESSION_TOKEN_REQUIRED))?;
        let removed = self
            .store
            .delete_session(&hash_session_token(token.trim()))
            .await?;
        debug!(removed, "Admin session logout");
        Ok(())
    }

    /// Delete all expired sessions and return how many were removed.
    ///
    /// # Errors
    /// `Internal` if the store fails.
    pub async fn cleanup(&self) -> Result<u64, AdminAuthError> {
        let removed = self.store.delete_expired_sessions(self.clock.now()).await?;
        if removed > 0 {
            info!(removed, "Expired admin sessions removed");
        }
        Ok(removed)
    }

    async fn record_attempt(&self, origin: &RequestOrigin, success: bool, now: DateTime<Utc>) {
        let attempt = LoginAttempt {
            ip_address: origin.ip_address.clone(),
            success,
            user_agent: origin.user_agent.clone(),
            created_at: now,
        };
        if let Err(err) = self.store.record_login_attempt(&attempt).await {
            warn!("Failed to record admin login attempt: {err:#}");
        }
    }
}

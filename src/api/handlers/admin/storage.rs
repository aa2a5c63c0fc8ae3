//! Storage seam for admin sessions, login attempts and registrant lists.
//!
//! Flow Overview:
//! 1) Sessions are keyed by the SHA-256 of the token; raw tokens never reach the store.
//! 2) Verification updates `last_used_at` and filters on `expires_at` in one step, so an
//!    expired row can never be returned.
//! 3) Login attempts are append-only and only ever counted by origin address.
//!
//! `PgAdminStore` is the production backend; `MemoryAdminStore` serves tests and
//! local runs without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub id: Uuid,
    pub token_hash: Vec<u8>,
    pub user_identity: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub ip_address: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub ip_address: String,
    pub success: bool,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Attendee or interest sign-up. Ids are assigned by the registration flow, not here.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub affiliation: Option<String>,
    pub status: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AdminStore: Send + Sync + Debug {
    /// Persist a new session. Returns only once the row is committed.
    async fn insert_session(&self, session: &AdminSession) -> Result<()>;

    /// Mark a live session as used and return its owner.
    ///
    /// Sessions with `expires_at <= now` are treated as absent.
    async fn touch_session(&self, token_hash: &[u8], now: DateTime<Utc>)
        -> Result<Option<String>>;

    /// Returns `true` if a row was removed.
    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool>;

    /// Returns the number of rows removed.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()>;

    /// Failed attempts from `ip_address` created strictly after `since`.
    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64>;

    /// Newest first.
    async fn list_attendees(&self) -> Result<Vec<Registrant>>;

    /// Newest first.
    async fn list_interests(&self) -> Result<Vec<Registrant>>;

    async fn ping(&self) -> Result<()>;
}

//! In-process `AdminStore` used by tests and by local runs started without `--dsn`.
//!
//! State is lost on restart and is not shared between processes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::storage::{AdminSession, AdminStore, LoginAttempt, Registrant};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<Vec<u8>, AdminSession>,
    attempts: Vec<LoginAttempt>,
    attendees: Vec<Registrant>,
    interests: Vec<Registrant>,
}

#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    inner: Mutex<Inner>,
}

impl MemoryAdminStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_attendee(&self, attendee: Registrant) {
        self.inner.lock().await.attendees.push(attendee);
    }

    pub async fn add_interest(&self, interest: Registrant) {
        self.inner.lock().await.interests.push(interest);
    }

    pub async fn session(&self, token_hash: &[u8]) -> Option<AdminSession> {
        self.inner.lock().await.sessions.get(token_hash).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn attempts(&self) -> Vec<LoginAttempt> {
        self.inner.lock().await.attempts.clone()
    }
}

fn newest_first(rows: &[Registrant]) -> Vec<Registrant> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn insert_session(&self, session: &AdminSession) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&session.token_hash) {
            anyhow::bail!("duplicate admin session token");
        }
        inner
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn touch_session(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get_mut(token_hash) else {
            return Ok(None);
        };
        if session.expires_at <= now {
            return Ok(None);
        }
        session.last_used_at = Some(now);
        Ok(Some(session.user_identity.clone()))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool> {
        Ok(self.inner.lock().await.sessions.remove(token_hash).is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| session.expires_at > now);
        Ok(u64::try_from(before - inner.sessions.len()).unwrap_or(u64::MAX))
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        self.inner.lock().await.attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        let inner = self.inner.lock().await;
        let count = inner
            .attempts
            .iter()
            .filter(|attempt| {
                !attempt.success && attempt.ip_address == ip_address && attempt.created_at > since
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn list_attendees(&self) -> Result<Vec<Registrant>> {
        Ok(newest_first(&self.inner.lock().await.attendees))
    }

    async fn list_interests(&self) -> Result<Vec<Registrant>> {
        Ok(newest_first(&self.inner.lock().await.interests))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

//! PostgreSQL-backed `AdminStore`.
//!
//! Scaling: every instance reads and writes the same tables, so sessions, attempt
//! counts and reaping are consistent across replicas without in-process state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};

use super::storage::{AdminSession, AdminStore, LoginAttempt, Registrant};

#[derive(Debug, Clone)]
pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn registrant_from_row(row: &PgRow) -> Registrant {
    Registrant {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        affiliation: row.get("affiliation"),
        status: row.get("status"),
        payment_reference: row.get("payment_reference"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn insert_session(&self, session: &AdminSession) -> Result<()> {
        let query = r"
            INSERT INTO admin_sessions
                (id, token_hash, user_identity, created_at, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(session.id)
            .bind(&session.token_hash)
            .bind(&session.user_identity)
            .bind(session.created_at)
            .bind(session.expires_at)
            .bind(&session.ip_address)
            .bind(session.user_agent.as_deref())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert admin session")?;
        Ok(())
    }

    async fn touch_session(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let query = r"
            UPDATE admin_sessions
            SET last_used_at = $2
            WHERE token_hash = $1
              AND expires_at > $2
            RETURNING user_identity
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to verify admin session")?;
        Ok(row.map(|row| row.get("user_identity")))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool> {
        let query = "DELETE FROM admin_sessions WHERE token_hash = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete admin session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let query = "DELETE FROM admin_sessions WHERE expires_at <= $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete expired admin sessions")?;
        Ok(result.rows_affected())
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        let query = r"
            INSERT INTO admin_login_attempts (id, ip_address, success, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(uuid::Uuid::new_v4())
            .bind(&attempt.ip_address)
            .bind(attempt.success)
            .bind(attempt.user_agent.as_deref())
            .bind(attempt.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record admin login attempt")?;
        Ok(())
    }

    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        let query = r"
            SELECT COUNT(*) AS count
            FROM admin_login_attempts
            WHERE ip_address = $1
              AND success = FALSE
              AND created_at > $2
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(ip_address)
            .bind(since)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to count admin login failures")?;
        Ok(row.get("count"))
    }

    async fn list_attendees(&self) -> Result<Vec<Registrant>> {
        let query = r"
            SELECT id, name, email, affiliation, status,
                   stripe_session_id AS payment_reference, created_at
            FROM attendee
            ORDER BY created_at DESC
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list attendees")?;
        Ok(rows.iter().map(registrant_from_row).collect())
    }

    async fn list_interests(&self) -> Result<Vec<Registrant>> {
        let query = r"
            SELECT id, name, email, affiliation, NULL::text AS status,
                   NULL::text AS payment_reference, created_at
            FROM interest
            ORDER BY created_at DESC
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list interests")?;
        Ok(rows.iter().map(registrant_from_row).collect())
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

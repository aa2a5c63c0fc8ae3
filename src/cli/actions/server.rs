use crate::api::{
    self,
    handlers::admin::{
        AdminAuthConfig, AdminAuthService, AdminStore, FailurePolicy, MemoryAdminStore,
        PgAdminStore, SystemClock,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub admin_secret: SecretString,
    pub admin_identity: String,
    pub session_ttl_seconds: i64,
    pub rate_limit_threshold: u32,
    pub rate_limit_window_seconds: i64,
    pub rate_limit_policy: FailurePolicy,
    pub reaper_interval_seconds: u64,
}

/// DSN with the password masked, for logs.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable dsn>".to_string(),
    }
}

async fn store(dsn: Option<&str>) -> Result<Arc<dyn AdminStore>> {
    let Some(dsn) = dsn else {
        warn!("No --dsn given: admin sessions and login attempts are kept in memory only");
        return Ok(Arc::new(MemoryAdminStore::new()));
    };

    info!("Connecting to database: {}", redact_dsn(dsn));

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    Ok(Arc::new(PgAdminStore::new(pool)))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the admin secret is unusable, or the
/// server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = store(args.dsn.as_deref()).await?;

    let config = AdminAuthConfig::new(args.admin_secret, args.admin_identity)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_rate_limit_threshold(args.rate_limit_threshold)
        .with_rate_limit_window_seconds(args.rate_limit_window_seconds)
        .with_rate_limit_policy(args.rate_limit_policy)
        .with_reaper_interval_seconds(args.reaper_interval_seconds);

    info!(
        rate_limit_policy = %args.rate_limit_policy,
        rate_limit_threshold = args.rate_limit_threshold,
        "Admin auth configured"
    );

    let service = AdminAuthService::new(config, store, Arc::new(SystemClock))?;

    api::new(args.port, Arc::new(service)).await
}

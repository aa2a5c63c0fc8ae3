//! Background task that deletes expired admin sessions.
//!
//! Deletion is idempotent, so several replicas may run their own reaper against the
//! same database.

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::error;

use super::service::AdminAuthService;

#[must_use]
pub fn spawn_session_reaper(
    service: Arc<AdminAuthService>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = service.cleanup().await {
                error!("admin session reaper failed: {err:#}");
            }
        }
    })
}

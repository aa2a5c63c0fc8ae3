//! Admin session auth: secret exchange, session verification, rate limiting and reaping,
//! plus the session-gated registrant listing.
//!
//! Flow Overview:
//! 1) The dashboard posts the admin secret to `/v1/admin/auth` with `action = "login"`.
//! 2) The service checks the per-origin failure count, compares the secret in constant
//!    time, logs the attempt, persists a session and returns its token.
//! 3) Later calls present the token (`verify`, `logout`, or `Authorization: Bearer` on
//!    `/v1/admin/registrants`).
//! 4) A background reaper deletes expired sessions every `--reaper-interval-seconds`.

pub mod auth;
pub mod clock;
pub mod error;
pub mod memory_storage;
pub mod pg_storage;
pub mod rate_limit;
pub mod reaper;
pub mod registrants;
pub mod secret;
pub mod service;
pub mod state;
pub mod storage;
pub mod types;
pub mod validate;

mod utils;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AdminAuthError;
pub use memory_storage::MemoryAdminStore;
pub use pg_storage::PgAdminStore;
pub use rate_limit::{FailurePolicy, RateLimitConfig};
pub use reaper::spawn_session_reaper;
pub use service::{AdminAuthService, IssuedSession, RequestOrigin};
pub use state::AdminAuthConfig;
pub use storage::{AdminSession, AdminStore, LoginAttempt, Registrant};

//! # Regdesk (Conference Registration Admin Service)
//!
//! `regdesk` backs the admin dashboard of a conference registration website.
//! It issues time-bounded admin sessions in exchange for a shared admin secret
//! and serves the registrant lists (paid attendees and interest sign-ups) to
//! holders of a valid session.
//!
//! ## Admin Sessions
//!
//! - **Secret check:** the submitted secret is compared in constant time against the
//!   secret injected at startup. There is no default-allow path.
//! - **Tokens:** 32 random bytes plus a timestamp, digested with SHA-256 and hex encoded.
//!   Only the SHA-256 of the token is stored, and the token is returned to the caller
//!   only after the session row is committed.
//! - **Expiry:** sessions last eight hours by default and are never renewed implicitly.
//!   A background reaper deletes expired rows every minute.
//!
//! ## Rate Limiting
//!
//! Failed attempts are logged per origin address. Once the failures inside the trailing
//! window reach the configured threshold, further attempts get `429 Too Many Requests`
//! before the secret is examined. Whether a broken attempt counter allows or rejects
//! is an explicit configuration value.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

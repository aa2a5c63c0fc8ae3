//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to run, currently only the API server
//! with its admin auth settings.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::admin;
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .filter(|v| !v.trim().is_empty());

    let admin_opts = admin::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        admin_secret: admin_opts.secret,
        admin_identity: admin_opts.identity,
        session_ttl_seconds: admin_opts.session_ttl_seconds,
        rate_limit_threshold: admin_opts.rate_limit_threshold,
        rate_limit_window_seconds: admin_opts.rate_limit_window_seconds,
        rate_limit_policy: admin_opts.rate_limit_policy,
        reaper_interval_seconds: admin_opts.reaper_interval_seconds,
    }))
}

use crate::api::handlers::admin::{state::MAX_DURATION_SECONDS, FailurePolicy};
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_ADMIN_SECRET: &str = "admin-secret";
pub const ARG_ADMIN_IDENTITY: &str = "admin-identity";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RATE_LIMIT_THRESHOLD: &str = "rate-limit-threshold";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";
pub const ARG_RATE_LIMIT_POLICY: &str = "rate-limit-policy";
pub const ARG_REAPER_INTERVAL_SECONDS: &str = "reaper-interval-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret: SecretString,
    pub identity: String,
    pub session_ttl_seconds: i64,
    pub rate_limit_threshold: u32,
    pub rate_limit_window_seconds: i64,
    pub rate_limit_policy: FailurePolicy,
    pub reaper_interval_seconds: u64,
}

impl Options {
    /// Parse admin auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret or identity is missing or blank, or a numeric value
    /// is out of range.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Env vars set to "" still reach here as Some("")
        let required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let secret = SecretString::from(required(ARG_ADMIN_SECRET)?);
        let identity = required(ARG_ADMIN_IDENTITY)?.trim().to_string();

        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(28_800);
        if !(1..=MAX_DURATION_SECONDS).contains(&session_ttl_seconds) {
            anyhow::bail!("--{ARG_SESSION_TTL_SECONDS} must be between 1 and {MAX_DURATION_SECONDS}");
        }

        let rate_limit_threshold = matches
            .get_one::<u32>(ARG_RATE_LIMIT_THRESHOLD)
            .copied()
            .unwrap_or(5);
        if rate_limit_threshold == 0 {
            anyhow::bail!("--{ARG_RATE_LIMIT_THRESHOLD} must be at least 1");
        }

        let rate_limit_window_seconds = matches
            .get_one::<i64>(ARG_RATE_LIMIT_WINDOW_SECONDS)
            .copied()
            .unwrap_or(900);
        if !(1..=MAX_DURATION_SECONDS).contains(&rate_limit_window_seconds) {
            anyhow::bail!(
                "--{ARG_RATE_LIMIT_WINDOW_SECONDS} must be between 1 and {MAX_DURATION_SECONDS}"
            );
        }

        let rate_limit_policy = matches
            .get_one::<String>(ARG_RATE_LIMIT_POLICY)
            .map(|value| value.parse::<FailurePolicy>())
            .transpose()
            .map_err(|err| anyhow::anyhow!(err))?
            .unwrap_or_default();

        Ok(Self {
            secret,
            identity,
            session_ttl_seconds,
            rate_limit_threshold,
            rate_limit_window_seconds,
            rate_limit_policy,
            reaper_interval_seconds: matches
                .get_one::<u64>(ARG_REAPER_INTERVAL_SECONDS)
                .copied()
                .unwrap_or(60),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_SECRET)
                .long(ARG_ADMIN_SECRET)
                .help("Shared admin secret exchanged for sessions")
                .env("REGDESK_ADMIN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_IDENTITY)
                .long(ARG_ADMIN_IDENTITY)
                .help("Identity recorded on every admin session")
                .env("REGDESK_ADMIN_IDENTITY"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Admin session lifetime in seconds")
                .env("REGDESK_SESSION_TTL_SECONDS")
                .default_value("28800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_DURATION_SECONDS)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_THRESHOLD)
                .long(ARG_RATE_LIMIT_THRESHOLD)
                .help("Failed attempts per address before further attempts are rejected")
                .env("REGDESK_RATE_LIMIT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Trailing window for counting failed attempts, in seconds")
                .env("REGDESK_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_DURATION_SECONDS)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_POLICY)
                .long(ARG_RATE_LIMIT_POLICY)
                .help("Behaviour when failed attempts cannot be counted")
                .long_help(
                    "Behaviour when failed attempts cannot be counted.\n\n`open` lets the attempt through to the secret check, `closed` rejects it with 429.",
                )
                .env("REGDESK_RATE_LIMIT_POLICY")
                .default_value("open")
                .value_parser(PossibleValuesParser::new(["open", "closed"])),
        )
        .arg(
            Arg::new(ARG_REAPER_INTERVAL_SECONDS)
                .long(ARG_REAPER_INTERVAL_SECONDS)
                .help("How often expired sessions are deleted, in seconds")
                .env("REGDESK_REAPER_INTERVAL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

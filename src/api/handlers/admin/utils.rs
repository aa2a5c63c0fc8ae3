//! Small helpers for admin session tokens and request metadata.

use anyhow::{Context, Result};
use axum::http::{
    header::{AUTHORIZATION, USER_AGENT},
    HeaderMap,
};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::net::IpAddr;

const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// Create a new admin session token.
///
/// 32 bytes of OS randomness plus the issue timestamp, digested with SHA-256 and hex encoded.
/// The raw value only goes back to the caller; the store keeps `hash_session_token` of it.
pub(crate) fn generate_session_token(now: DateTime<Utc>) -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.update(now.timestamp_millis().to_string().as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Resolve the origin address used for rate limiting and the session record.
///
/// Checks `cf-connecting-ip`, `x-real-ip` and `x-forwarded-for` in that order and keeps the
/// first comma-separated entry. Anything that does not parse as an IP becomes `127.0.0.1`.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    let raw = ["cf-connecting-ip", "x-real-ip", "x-forwarded-for"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty());

    raw.and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|value| value.parse::<IpAddr>().ok())
        .map_or_else(|| FALLBACK_CLIENT_IP.to_string(), |ip| ip.to_string())
}

/// `Authorization: Bearer <token>`, if present and non-empty.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Client descriptor: the body field wins, the `User-Agent` header is the fallback.
pub(crate) fn client_descriptor(body_value: Option<String>, headers: &HeaderMap) -> Option<String> {
    body_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
}

/// Treat blank strings like missing fields.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Only absent or empty values count as missing; whitespace is a real (wrong) secret.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

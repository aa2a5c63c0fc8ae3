//! Admin endpoint tests, driven through the full router against the in-memory store.

use super::{
    clock::{Clock, ManualClock},
    memory_storage::MemoryAdminStore,
    rate_limit::FailurePolicy,
    service::AdminAuthService,
    state::AdminAuthConfig,
    storage::{AdminSession, AdminStore, LoginAttempt, Registrant},
    utils::hash_session_token,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN, USER_AGENT},
        Request, StatusCode,
    },
    Router,
};
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "correct-horse-battery-staple";
const IDENTITY: &str = "registration-admin";
const CLIENT_IP: &str = "203.0.113.7";

struct Harness {
    app: Router,
    store: Arc<MemoryAdminStore>,
    clock: Arc<ManualClock>,
}

fn config() -> AdminAuthConfig {
    AdminAuthConfig::new(SecretString::from(SECRET.to_string()), IDENTITY.to_string())
}

fn harness_with(config: AdminAuthConfig) -> Result<Harness> {
    let store = Arc::new(MemoryAdminStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = AdminAuthService::new(config, store.clone(), clock.clone())?;
    Ok(Harness {
        app: crate::api::app(Arc::new(service)),
        store,
        clock,
    })
}

fn harness() -> Result<Harness> {
    harness_with(config())
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

async fn post_from(app: &Router, uri: &str, ip: &str, payload: &Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))?;
    send(app, request).await
}

async fn auth(app: &Router, payload: &Value) -> Result<(StatusCode, Value)> {
    post_from(app, "/v1/admin/auth", CLIENT_IP, payload).await
}

async fn login(app: &Router) -> Result<String> {
    let (status, body) = auth(app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["sessionToken"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing session token in {body}"))
}

#[tokio::test]
async fn login_then_verify_returns_configured_identity() -> Result<()> {
    let h = harness()?;
    let (status, body) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let token = body["sessionToken"].as_str().unwrap_or_default().to_string();
    assert_eq!(token.len(), 64);

    let expires_at = body["expiresAt"]
        .as_str()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc));
    let expected = h.clock.now() + Duration::hours(8);
    assert_eq!(
        expires_at.map(|value| value.timestamp_millis()),
        Some(expected.timestamp_millis())
    );

    let (status, body) = auth(&h.app, &json!({ "action": "verify", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], json!(IDENTITY));
    Ok(())
}

#[tokio::test]
async fn stored_session_keeps_only_the_token_hash() -> Result<()> {
    let h = harness()?;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/admin/auth")
        .header("x-real-ip", "198.51.100.4")
        .header(USER_AGENT, "dashboard/1.0")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "action": "login", "secret": SECRET }).to_string(),
        ))?;
    let (status, body) = send(&h.app, request).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["sessionToken"].as_str().unwrap_or_default();

    let session = h.store.session(&hash_session_token(token)).await;
    assert!(session.is_some());
    if let Some(session) = session {
        assert_eq!(session.user_identity, IDENTITY);
        assert_eq!(session.ip_address, "198.51.100.4");
        assert_eq!(session.user_agent.as_deref(), Some("dashboard/1.0"));
        assert_eq!(session.last_used_at, None);
        assert_ne!(session.token_hash, token.as_bytes());
    }
    Ok(())
}

#[tokio::test]
async fn any_wrong_secret_is_rejected() -> Result<()> {
    let h = harness_with(config().with_rate_limit_threshold(100))?;
    for secret in [
        "wrong",
        "correct-horse-battery-stapl",
        "correct-horse-battery-staple ",
        "CORRECT-HORSE-BATTERY-STAPLE",
        "correct-horse-battery-staple\0",
    ] {
        let (status, body) = auth(
            &h.app,
            &json!({ "action": "login", "secret": secret, "userAgent": "scanner" }),
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "secret {secret:?}");
        assert_eq!(body, json!({ "success": false, "error": "Invalid credentials" }));
    }
    assert_eq!(h.store.session_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn session_expires_and_is_never_renewed() -> Result<()> {
    let h = harness()?;
    let token = login(&h.app).await?;

    h.clock.advance(Duration::hours(8) - Duration::seconds(1));
    let (status, _) = auth(&h.app, &json!({ "action": "verify", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::OK);

    // verification one second before expiry must not push the expiry out
    h.clock.advance(Duration::seconds(1));
    let (status, body) = auth(&h.app, &json!({ "action": "verify", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid or expired session"));
    Ok(())
}

#[tokio::test]
async fn verify_updates_last_used() -> Result<()> {
    let h = harness()?;
    let token = login(&h.app).await?;
    h.clock.advance(Duration::minutes(3));
    let (status, _) = auth(&h.app, &json!({ "action": "verify", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::OK);

    let session = h.store.session(&hash_session_token(&token)).await;
    assert_eq!(
        session.and_then(|s| s.last_used_at).map(|t| t.timestamp_millis()),
        Some(h.clock.now().timestamp_millis())
    );
    Ok(())
}

#[tokio::test]
async fn rate_limit_rejects_sixth_attempt_before_checking_secret() -> Result<()> {
    let h = harness()?;
    for _ in 0..5 {
        let (status, _) = auth(&h.app, &json!({ "action": "login", "secret": "guess" })).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        h.clock.advance(Duration::minutes(2));
    }

    // correct secret, still limited
    let (status, body) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], json!(false));
    assert!(body.get("sessionToken").is_none());
    assert_eq!(h.store.session_count().await, 0);

    // the rejected attempt is still recorded, as a failure
    let attempts = h.store.attempts().await;
    assert_eq!(attempts.len(), 6);
    assert!(attempts.iter().all(|attempt| !attempt.success));

    // other origins are unaffected
    let (status, _) = post_from(
        &h.app,
        "/v1/admin/auth",
        "192.0.2.99",
        &json!({ "action": "login", "secret": SECRET }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn rate_limit_window_slides() -> Result<()> {
    let h = harness()?;
    for _ in 0..5 {
        auth(&h.app, &json!({ "action": "login", "secret": "guess" })).await?;
    }
    let (status, _) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // the rejected attempt above is a failure too; wait until all six have aged out
    h.clock.advance(Duration::minutes(15) + Duration::seconds(1));
    let (status, _) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_session() -> Result<()> {
    let h = harness()?;
    let token = login(&h.app).await?;

    let (status, body) = auth(&h.app, &json!({ "action": "logout", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _) = auth(&h.app, &json!({ "action": "verify", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // logging out twice is fine
    let (status, _) = auth(&h.app, &json!({ "action": "logout", "sessionToken": token })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn cleanup_is_idempotent() -> Result<()> {
    let h = harness()?;
    login(&h.app).await?;
    login(&h.app).await?;
    h.clock.advance(Duration::hours(9));
    let live = login(&h.app).await?;

    let (status, body) = auth(&h.app, &json!({ "action": "cleanup" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Cleanup completed"));
    assert_eq!(body["removed"], json!(2));

    let (status, body) = auth(&h.app, &json!({ "action": "cleanup" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(0));

    assert_eq!(h.store.session_count().await, 1);
    let (status, _) = auth(&h.app, &json!({ "action": "verify", "sessionToken": live })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_fields_and_bad_actions_are_bad_requests() -> Result<()> {
    let h = harness()?;

    let (status, body) = auth(&h.app, &json!({ "action": "login" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Secret required"));

    let (status, _) = auth(&h.app, &json!({ "action": "login", "secret": "" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for action in ["verify", "logout"] {
        let (status, body) = auth(&h.app, &json!({ "action": action })).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Session token required"));
    }

    let (status, body) = auth(&h.app, &json!({ "action": "escalate" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid request"));

    // a missing secret is not a failed attempt
    assert!(h.store.attempts().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn whitespace_secret_is_a_counted_failure() -> Result<()> {
    let h = harness()?;
    let (status, body) = auth(&h.app, &json!({ "action": "login", "secret": "   " })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid credentials"));

    let (status, body) =
        post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({ "secret": " " })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));

    let attempts = h.store.attempts().await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|attempt| !attempt.success));
    Ok(())
}

#[tokio::test]
async fn expiry_overflow_is_an_internal_error() -> Result<()> {
    let h = harness()?;
    h.clock.set(DateTime::<Utc>::MAX_UTC - Duration::hours(1));

    let (status, body) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("sessionToken").is_none());
    assert_eq!(h.store.session_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn non_post_methods_are_rejected() -> Result<()> {
    let h = harness()?;
    let request = Request::builder()
        .method("GET")
        .uri("/v1/admin/auth")
        .body(Body::empty())?;
    let (status, _) = send(&h.app, request).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn responses_allow_any_origin() -> Result<()> {
    let h = harness()?;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/v1/admin/auth")
        .header(ORIGIN, "https://conference.example.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,apikey")
        .body(Body::empty())?;
    let response = h.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let request = Request::builder()
        .method("POST")
        .uri("/v1/admin/auth")
        .header(ORIGIN, "https://conference.example.org")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "action": "cleanup" }).to_string()))?;
    let response = h.app.clone().oneshot(request).await?;
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}

#[tokio::test]
async fn validate_endpoint_reports_secret_validity() -> Result<()> {
    let h = harness()?;

    let (status, body) = post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({ "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true }));

    let (status, body) = post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({ "secret": "nope" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));

    let (status, body) = post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "valid": false, "error": "No secret provided" }));

    // validation never creates sessions
    assert_eq!(h.store.session_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn validate_endpoint_shares_the_rate_limiter() -> Result<()> {
    let h = harness()?;
    for _ in 0..5 {
        post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({ "secret": "nope" })).await?;
    }
    let (status, body) = post_from(&h.app, "/v1/admin/validate", CLIENT_IP, &json!({ "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["valid"], json!(false));

    let (status, _) = auth(&h.app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

fn registrant(id: &str, created_at: DateTime<Utc>, status: Option<&str>) -> Registrant {
    Registrant {
        id: id.to_string(),
        name: Some(format!("Attendee {id}")),
        email: format!("{id}@example.org"),
        affiliation: Some("University".to_string()),
        status: status.map(str::to_string),
        payment_reference: status.map(|_| format!("cs_{id}")),
        created_at,
    }
}

#[tokio::test]
async fn registrants_require_a_live_session() -> Result<()> {
    let h = harness()?;
    let now = Utc::now();
    h.store.add_attendee(registrant("a1", now - Duration::days(2), Some("PAID"))).await;
    h.store.add_attendee(registrant("a2", now - Duration::days(1), Some("PAID"))).await;
    h.store.add_interest(registrant("i1", now, None)).await;

    let anonymous = Request::builder()
        .uri("/v1/admin/registrants")
        .body(Body::empty())?;
    let (status, _) = send(&h.app, anonymous).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&h.app).await?;
    let request = Request::builder()
        .uri("/v1/admin/registrants")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, body) = send(&h.app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attendees"][0]["id"], json!("a2"));
    assert_eq!(body["attendees"][1]["id"], json!("a1"));
    assert_eq!(body["attendees"][0]["paymentReference"], json!("cs_a2"));
    assert_eq!(body["interests"][0]["email"], json!("i1@example.org"));

    h.clock.advance(Duration::hours(8));
    let request = Request::builder()
        .uri("/v1/admin/registrants")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, _) = send(&h.app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let h = harness()?;
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = h.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    Ok(())
}

/// Store wrapper that can be told to fail individual operations.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryAdminStore,
    fail_insert: bool,
    fail_count: bool,
}

#[async_trait]
impl AdminStore for FlakyStore {
    async fn insert_session(&self, session: &AdminSession) -> Result<()> {
        if self.fail_insert {
            return Err(anyhow!("connection reset by peer"));
        }
        self.inner.insert_session(session).await
    }

    async fn touch_session(&self, token_hash: &[u8], now: DateTime<Utc>) -> Result<Option<String>> {
        self.inner.touch_session(token_hash, now).await
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool> {
        self.inner.delete_session(token_hash).await
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_expired_sessions(now).await
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        self.inner.record_login_attempt(attempt).await
    }

    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        if self.fail_count {
            return Err(anyhow!("statement timeout"));
        }
        self.inner.count_failed_attempts(ip_address, since).await
    }

    async fn list_attendees(&self) -> Result<Vec<Registrant>> {
        self.inner.list_attendees().await
    }

    async fn list_interests(&self) -> Result<Vec<Registrant>> {
        self.inner.list_interests().await
    }

    async fn ping(&self) -> Result<()> {
        if self.fail_insert {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(())
    }
}

fn flaky_app(store: FlakyStore, config: AdminAuthConfig) -> Result<Router> {
    let service = AdminAuthService::new(
        config,
        Arc::new(store),
        Arc::new(ManualClock::new(Utc::now())),
    )?;
    Ok(crate::api::app(Arc::new(service)))
}

#[tokio::test]
async fn token_is_withheld_when_session_cannot_be_stored() -> Result<()> {
    let app = flaky_app(
        FlakyStore {
            fail_insert: true,
            ..FlakyStore::default()
        },
        config(),
    )?;
    let (status, body) = auth(&app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "success": false, "error": "Internal server error" }));

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], json!("error"));
    Ok(())
}

#[tokio::test]
async fn broken_counter_fails_open_by_default() -> Result<()> {
    let app = flaky_app(
        FlakyStore {
            fail_count: true,
            ..FlakyStore::default()
        },
        config(),
    )?;
    let (status, _) = auth(&app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn broken_counter_fails_closed_when_configured() -> Result<()> {
    let app = flaky_app(
        FlakyStore {
            fail_count: true,
            ..FlakyStore::default()
        },
        config().with_rate_limit_policy(FailurePolicy::Closed),
    )?;
    let (status, _) = auth(&app, &json!({ "action": "login", "secret": SECRET })).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[test]
fn empty_admin_secret_is_refused_at_startup() {
    let config = AdminAuthConfig::new(SecretString::from(String::new()), IDENTITY.to_string());
    let service = AdminAuthService::new(
        config,
        Arc::new(MemoryAdminStore::new()),
        Arc::new(ManualClock::new(Utc::now())),
    );
    assert!(service.is_err());
}

#[test]
fn oversized_ttl_or_window_is_refused_at_startup() {
    for config in [
        config().with_session_ttl_seconds(10_000_000_000_000),
        config().with_session_ttl_seconds(i64::MAX),
        config().with_rate_limit_window_seconds(10_000_000_000_000),
        config().with_rate_limit_window_seconds(i64::MAX),
    ] {
        let service = AdminAuthService::new(
            config,
            Arc::new(MemoryAdminStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        assert!(service.is_err());
    }
}

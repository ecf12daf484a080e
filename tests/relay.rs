//! Gateway relay behavior against a recording stub upstream.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header::COOKIE, header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pordego::cli::globals::GlobalArgs;
use pordego::gateway::{self, handlers::extract_cookie_value};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::net::TcpListener;

const SESSION_COOKIE: &str = "session=tok-123; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600";

#[derive(Default)]
struct UpstreamCalls {
    login: AtomicUsize,
    register: AtomicUsize,
    me: AtomicUsize,
}

#[derive(Clone)]
struct StubConfig {
    login_status: u16,
    login_body: String,
    set_cookie: Option<String>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            login_status: 200,
            login_body: json!({
                "user": { "id": "u1", "name": "Alice", "email": "a@b.com", "role": "buyer" }
            })
            .to_string(),
            set_cookie: Some(SESSION_COOKIE.to_string()),
        }
    }
}

#[derive(Clone)]
struct StubState {
    calls: Arc<UpstreamCalls>,
    config: StubConfig,
}

async fn stub_login(State(state): State<StubState>, _body: Json<Value>) -> Response {
    state.calls.login.fetch_add(1, Ordering::SeqCst);

    let mut headers = HeaderMap::new();
    if let Some(cookie) = &state.config.set_cookie {
        headers.insert(SET_COOKIE, cookie.parse().expect("cookie header"));
    }
    let status = StatusCode::from_u16(state.config.login_status).expect("status");
    (status, headers, state.config.login_body.clone()).into_response()
}

async fn stub_register(State(state): State<StubState>, _body: Json<Value>) -> Response {
    state.calls.register.fetch_add(1, Ordering::SeqCst);

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, SESSION_COOKIE.parse().expect("cookie header"));
    (
        StatusCode::CREATED,
        headers,
        Json(json!({
            "user": { "id": "u2", "name": "Bob", "email": "b@c.com", "role": "seller" }
        })),
    )
        .into_response()
}

async fn stub_me(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.calls.me.fetch_add(1, Ordering::SeqCst);

    let has_session = headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("session=tok-123"));

    if has_session {
        (
            StatusCode::OK,
            Json(json!({
                "user": { "id": "u1", "name": "Alice", "email": "a@b.com", "role": "buyer" }
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "unauthorized" })),
        )
            .into_response()
    }
}

fn upstream_app(state: StubState) -> Router {
    Router::new()
        .route("/auth/login", post(stub_login))
        .route("/auth/register", post(stub_register))
        .route("/auth/me", get(stub_me))
        .with_state(state)
}

async fn spawn(app: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind a local port")?;
    let addr = listener.local_addr().context("Failed to read local port")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}

struct Harness {
    gateway_url: String,
    calls: Arc<UpstreamCalls>,
}

async fn harness(config: StubConfig) -> Result<Harness> {
    let calls = Arc::new(UpstreamCalls::default());
    let upstream_addr = spawn(upstream_app(StubState {
        calls: calls.clone(),
        config,
    }))
    .await?;

    let globals = GlobalArgs::new(format!("http://{upstream_addr}"));
    let gateway_addr = spawn(gateway::app(&globals)?).await?;

    Ok(Harness {
        gateway_url: format!("http://{gateway_addr}"),
        calls,
    })
}

#[tokio::test]
async fn login_with_missing_password_never_reaches_upstream() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/login", harness.gateway_url))
        .json(&json!({ "email": "a@b.com" }))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "email and password are required");
    assert_eq!(harness.calls.login.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn whitespace_only_credentials_never_reach_upstream() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    for payload in [
        json!({ "email": "   ", "password": "hunter2" }),
        json!({ "email": "a@b.com", "password": "   " }),
    ] {
        let response = client
            .post(format!("{}/auth/login", harness.gateway_url))
            .json(&payload)
            .send()
            .await?;

        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await?;
        assert_eq!(body["message"], "email and password are required");
    }
    assert_eq!(harness.calls.login.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn registration_with_privileged_role_never_reaches_upstream() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    let payload = json!({
        "name": "Mallory",
        "email": "m@example.com",
        "password": "hunter2hunter2",
        "address": "1 Main St",
        "role": "superadmin"
    });
    let response = client
        .post(format!("{}/auth/register", harness.gateway_url))
        .json(&payload)
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await?;
    assert!(body["message"]
        .as_str()
        .is_some_and(|message| message.contains("superadmin")));
    assert_eq!(harness.calls.register.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn registration_rejects_roles_outside_self_service_set() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    for role in ["admin", "agent", "landlord"] {
        let payload = json!({
            "name": "Carol",
            "email": "c@example.com",
            "password": "hunter2hunter2",
            "address": "1 Main St",
            "role": role
        });
        let response = client
            .post(format!("{}/auth/register", harness.gateway_url))
            .json(&payload)
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 400, "role {role} must be rejected");
    }
    assert_eq!(harness.calls.register.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn registration_with_self_service_role_passes_through() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    let payload = json!({
        "name": "Bob",
        "email": "b@c.com",
        "password": "hunter2hunter2",
        "address": "1 Main St",
        "role": "Seller"
    });
    let response = client
        .post(format!("{}/auth/register", harness.gateway_url))
        .json(&payload)
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await?;
    assert_eq!(body["user"]["email"], "b@c.com");
    assert_eq!(body["token"], "tok-123");
    assert_eq!(harness.calls.register.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn login_relays_cookie_verbatim_and_surfaces_token() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/login", harness.gateway_url))
        .json(&json!({ "email": "a@b.com", "password": "hunter2" }))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 200);
    let relayed = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
        .context("missing relayed Set-Cookie")?;
    // The header passes through untouched, attributes included.
    assert_eq!(relayed, SESSION_COOKIE);

    let body: Value = response.json().await?;
    assert_eq!(body["token"], "tok-123");
    assert_eq!(body["user"]["name"], "Alice");
    Ok(())
}

#[tokio::test]
async fn upstream_rejection_passes_through_without_cookie() -> Result<()> {
    let config = StubConfig {
        login_status: 401,
        login_body: json!({ "message": "invalid credentials" }).to_string(),
        set_cookie: None,
    };
    let harness = harness(config).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/login", harness.gateway_url))
        .json(&json!({ "email": "a@b.com", "password": "wrong" }))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 401);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "invalid credentials");
    assert_eq!(harness.calls.login.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_upstream_body_does_not_crash_the_relay() -> Result<()> {
    let config = StubConfig {
        login_status: 200,
        login_body: "this is not json {{".to_string(),
        set_cookie: Some(SESSION_COOKIE.to_string()),
    };
    let harness = harness(config).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/login", harness.gateway_url))
        .json(&json!({ "email": "a@b.com", "password": "hunter2" }))
        .send()
        .await?;

    // Body degrades to an empty object; status and cookie still relay.
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers().get(SET_COOKIE).is_some());
    let body: Value = response.json().await?;
    assert_eq!(body["user"], Value::Null);
    assert_eq!(body["token"], "tok-123");
    Ok(())
}

#[tokio::test]
async fn relayed_cookie_round_trips_into_identity_fetch() -> Result<()> {
    let harness = harness(StubConfig::default()).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/login", harness.gateway_url))
        .json(&json!({ "email": "a@b.com", "password": "hunter2" }))
        .send()
        .await?;
    let relayed = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
        .context("missing relayed Set-Cookie")?;

    let token = extract_cookie_value(&relayed, "session").context("missing session cookie")?;

    let with_cookie = client
        .get(format!("{}/auth/me", harness.gateway_url))
        .header(COOKIE, format!("session={token}"))
        .send()
        .await?;
    assert_eq!(with_cookie.status().as_u16(), 200);
    let body: Value = with_cookie.json().await?;
    assert_eq!(body["user"]["email"], "a@b.com");

    let without_cookie = client
        .get(format!("{}/auth/me", harness.gateway_url))
        .send()
        .await?;
    assert_eq!(without_cookie.status().as_u16(), 401);

    assert_eq!(harness.calls.me.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_bad_gateway() -> Result<()> {
    // Point the gateway at a port nothing listens on.
    let globals = GlobalArgs::new("http://127.0.0.1:1".to_string());
    let gateway_addr = spawn(gateway::app(&globals)?).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{gateway_addr}/auth/login"))
        .json(&json!({ "email": "a@b.com", "password": "hunter2" }))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await?;
    assert!(body["message"]
        .as_str()
        .is_some_and(|message| message.contains("login failed")));
    Ok(())
}

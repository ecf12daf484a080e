pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod register;
pub use self::register::register;

pub mod federated;
pub use self::federated::federated;

pub mod session;
pub use self::session::{change_password, logout, me, update_profile};

// common functions for the handlers
use crate::gateway::GatewayState;
use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::error;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Extract the value paired with `cookie_name` from a raw `Set-Cookie`
/// header: a `name=value` match up to the next `;`. Decoupled from any HTTP
/// stack's cookie types; returns `None` when the cookie is not present.
#[must_use]
pub fn extract_cookie_value(set_cookie: &str, cookie_name: &str) -> Option<String> {
    for pair in set_cookie.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let Some(value) = parts.next() else { continue };
        if key == cookie_name {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// Best-effort human message for an upstream error body.
///
/// Upstream bodies are duck-typed: some carry `message`, some `error`.
/// Falls back to `"<operation> failed"` when neither is usable.
#[must_use]
pub fn normalize_upstream_error(body: &Value, operation: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map_or_else(|| format!("{operation} failed"), ToString::to_string)
}

/// Parse an upstream body, treating anything that is not valid JSON as an
/// empty object. The relay must never crash on malformed upstream output.
#[must_use]
pub fn lenient_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Forward a validated credential payload to the upstream identity service
/// and relay the outcome: on failure the upstream status and message pass
/// through unchanged, on success the `Set-Cookie` header is re-published
/// verbatim and the token value is surfaced in the JSON body for clients
/// that cannot read the cookie directly.
pub(crate) async fn relay_credentials(
    state: &GatewayState,
    path: &str,
    operation: &str,
    payload: &Value,
) -> Response {
    let response = match state
        .client
        .post(state.endpoint(path))
        .json(payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!("Upstream {operation} call failed: {err}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "message": format!("{operation} failed: upstream unreachable") })),
            )
                .into_response();
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let body = match response.text().await {
        Ok(text) => lenient_json(&text),
        Err(err) => {
            error!("Failed to read upstream {operation} body: {err}");
            lenient_json("")
        }
    };

    if !status.is_success() {
        return (
            status,
            Json(json!({ "message": normalize_upstream_error(&body, operation) })),
        )
            .into_response();
    }

    let token = set_cookie
        .as_deref()
        .and_then(|header| extract_cookie_value(header, &state.cookie_name));

    let mut headers = HeaderMap::new();
    if let Some(header) = set_cookie {
        // Relayed verbatim so upstream-controlled attributes survive.
        if let Ok(value) = HeaderValue::from_str(&header) {
            headers.insert(SET_COOKIE, value);
        }
    }

    let user = body.get("user").cloned().unwrap_or(Value::Null);

    (status, headers, Json(json!({ "user": user, "token": token }))).into_response()
}

//! Cookie-forwarding proxies for the upstream session endpoints.
//!
//! Each handler forwards the browser's `Cookie` header upstream and relays
//! status, body and any `Set-Cookie` unchanged. Nothing is cached and the
//! cookie is never inspected beyond passing it along.

use super::{lenient_json, normalize_upstream_error};
use crate::gateway::GatewayState;
use axum::{
    extract::Extension,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, instrument};

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current identity", content_type = "application/json"),
        (status = 401, description = "No valid session"),
    ),
    tag = "auth"
)]
// axum handler for the cookie-authenticated identity fetch
#[instrument(skip_all)]
pub async fn me(state: Extension<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    proxy(
        &state,
        reqwest::Method::GET,
        "/auth/me",
        &headers,
        None,
        "identity fetch",
    )
    .await
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cleared upstream"),
    ),
    tag = "auth"
)]
// axum handler for logout; the clearing Set-Cookie is relayed verbatim
#[instrument(skip_all)]
pub async fn logout(state: Extension<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    proxy(
        &state,
        reqwest::Method::POST,
        "/auth/logout",
        &headers,
        None,
        "logout",
    )
    .await
}

#[utoipa::path(
    patch,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile updated", content_type = "application/json"),
        (status = 401, description = "No valid session"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn update_profile(
    state: Extension<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Option<Json<Value>>,
) -> Response {
    proxy(
        &state,
        reqwest::Method::PATCH,
        "/auth/me",
        &headers,
        payload.map(|Json(body)| body),
        "profile update",
    )
    .await
}

#[utoipa::path(
    patch,
    path = "/auth/change-password",
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "No valid session"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn change_password(
    state: Extension<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Option<Json<Value>>,
) -> Response {
    proxy(
        &state,
        reqwest::Method::PATCH,
        "/auth/change-password",
        &headers,
        payload.map(|Json(body)| body),
        "password change",
    )
    .await
}

async fn proxy(
    state: &GatewayState,
    method: reqwest::Method,
    path: &str,
    headers: &HeaderMap,
    body: Option<Value>,
    operation: &str,
) -> Response {
    let mut request = state.client.request(method, state.endpoint(path));

    if let Some(cookie) = headers.get(COOKIE).and_then(|value| value.to_str().ok()) {
        request = request.header(reqwest::header::COOKIE, cookie);
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = match request.send().await {
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

    let mut response_headers = HeaderMap::new();
    if let Some(header) = set_cookie {
        if let Ok(value) = HeaderValue::from_str(&header) {
            response_headers.insert(SET_COOKIE, value);
        }
    }

    if status.is_success() {
        (status, response_headers, Json(body)).into_response()
    } else {
        (
            status,
            response_headers,
            Json(json!({ "message": normalize_upstream_error(&body, operation) })),
        )
            .into_response()
    }
}

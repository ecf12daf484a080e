use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::gateway::GIT_COMMIT_HASH;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Gateway is up", content_type = "application/json"),
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "build": GIT_COMMIT_HASH,
    }));

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}

use super::relay_credentials;
use crate::gateway::GatewayState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// One-time credential issued by the third-party sign-in widget. Opaque to
/// the gateway; only the upstream verifies it.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FederatedCredential {
    #[serde(default)]
    pub credential: String,
}

#[utoipa::path(
    post,
    path = "/auth/google",
    responses(
        (status = 200, description = "Federated login relayed, session cookie re-published", content_type = "application/json"),
        (status = 400, description = "Missing credential"),
    ),
    tag = "auth"
)]
// axum handler for federated login
#[instrument(skip_all)]
pub async fn federated(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<FederatedCredential>>,
) -> Response {
    let credential = match payload {
        Some(Json(body)) if !body.credential.trim().is_empty() => body.credential,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "credential is required" })),
            )
                .into_response()
        }
    };

    relay_credentials(
        &state,
        "/auth/google",
        "federated login",
        &json!({ "credential": credential }),
    )
    .await
}

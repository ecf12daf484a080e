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
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    responses(
        (status = 200, description = "Login relayed, session cookie re-published", content_type = "application/json"),
        (status = 400, description = "Missing email or password"),
    ),
    tag = "auth"
)]
// axum handler for login: validate locally, then relay upstream
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<Credentials>>,
) -> Response {
    let Some(Json(credentials)) = payload else {
        return missing_fields();
    };

    if credentials.email.trim().is_empty() || credentials.password.trim().is_empty() {
        return missing_fields();
    }

    debug!("relaying login for {}", credentials.email);

    relay_credentials(
        &state,
        "/auth/login",
        "login",
        &json!({
            "email": credentials.email,
            "password": credentials.password,
        }),
    )
    .await
}

fn missing_fields() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "email and password are required" })),
    )
        .into_response()
}

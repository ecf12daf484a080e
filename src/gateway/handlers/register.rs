use super::{relay_credentials, valid_email};
use crate::{gateway::GatewayState, roles};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub role: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    responses(
        (status = 201, description = "Registration relayed, session cookie re-published", content_type = "application/json"),
        (status = 400, description = "Missing fields or role not allowed for self-service"),
    ),
    tag = "auth"
)]
// axum handler for registration: the privileged tier never reaches upstream
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<Registration>>,
) -> Response {
    let Some(Json(registration)) = payload else {
        return bad_request("name, email, password, address and role are required");
    };

    if registration.name.trim().is_empty()
        || registration.email.trim().is_empty()
        || registration.password.trim().is_empty()
        || registration.address.trim().is_empty()
        || registration.role.trim().is_empty()
    {
        return bad_request("name, email, password, address and role are required");
    }

    if !valid_email(registration.email.trim()) {
        return bad_request("a valid email is required");
    }

    if !roles::registrable(&registration.role) {
        warn!(
            "rejected registration with role {:?} for {}",
            registration.role, registration.email
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": format!("role '{}' is not accepted for registration", registration.role)
            })),
        )
            .into_response();
    }

    debug!("relaying registration for {}", registration.email);

    relay_credentials(
        &state,
        "/auth/register",
        "registration",
        &json!({
            "name": registration.name,
            "email": registration.email,
            "password": registration.password,
            "address": registration.address,
            "role": registration.role.trim().to_lowercase(),
        }),
    )
    .await
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message })),
    )
        .into_response()
}

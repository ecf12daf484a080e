//! Client wrappers for the gateway auth endpoints. These helpers centralize
//! the cookie-bearing HTTP calls so the controller never builds raw
//! requests, and nothing here caches what the upstream returns.

use crate::client::types::{Identity, LoginOutcome, ProfileUpdate, RegisterRequest, StoreError};
use crate::gateway::{handlers::normalize_upstream_error, APP_USER_AGENT};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::instrument;

/// Cookie-jar backed accessor for the gateway's auth surface. The session
/// cookie lives in the jar; it is never read or stored anywhere else.
#[derive(Debug, Clone)]
pub struct SessionStore {
    client: Client,
    base_url: String,
}

impl SessionStore {
    /// Build an accessor for the given gateway base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|err| StoreError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Relay login; on success the session cookie lands in the jar.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, StoreError> {
        let payload = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let response = self
            .client
            .post(self.endpoint("/auth/login"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        decode(response, "login").await
    }

    /// Relay registration; no session is created.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), StoreError> {
        let payload = json!({
            "name": request.name,
            "email": request.email,
            "password": request.password.expose_secret(),
            "address": request.address,
            "role": request.role,
        });
        let response = self
            .client
            .post(self.endpoint("/auth/register"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        expect_success(response, "registration").await
    }

    /// Relay federated login with a one-time widget credential.
    #[instrument(skip_all)]
    pub async fn federated_login(&self, credential: &str) -> Result<LoginOutcome, StoreError> {
        let payload = json!({ "credential": credential });
        let response = self
            .client
            .post(self.endpoint("/auth/google"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        decode(response, "federated login").await
    }

    /// Fetch the current identity using the cookie jar. A 401 surfaces as
    /// `StoreError::Http { status: 401, .. }` for the controller to absorb.
    #[instrument(skip_all)]
    pub async fn current_identity(&self) -> Result<Identity, StoreError> {
        let response = self
            .client
            .get(self.endpoint("/auth/me"))
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        let wrapper: MeResponse = decode(response, "identity fetch").await?;
        Ok(wrapper.user)
    }

    /// Server-side logout; any clearing `Set-Cookie` updates the jar.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.endpoint("/auth/logout"))
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        expect_success(response, "logout").await
    }

    /// Partial profile update; returns only the fields the server reports
    /// back, so the caller can merge them.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        patch: &ProfileUpdate,
    ) -> Result<ProfileUpdate, StoreError> {
        let response = self
            .client
            .patch(self.endpoint("/auth/me"))
            .json(patch)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        let body: Value = decode(response, "profile update").await?;
        let fields = body.get("user").cloned().unwrap_or(body);
        serde_json::from_value(fields).map_err(|err| StoreError::Parse(err.to_string()))
    }

    /// Rotate the password for the current session.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<(), StoreError> {
        let payload = json!({
            "currentPassword": current.expose_secret(),
            "newPassword": new.expose_secret(),
        });
        let response = self
            .client
            .patch(self.endpoint("/auth/change-password"))
            .json(&payload)
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;

        expect_success(response, "password change").await
    }
}

#[derive(serde::Deserialize)]
struct MeResponse {
    user: Identity,
}

async fn decode<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T, StoreError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|err| StoreError::Network(err.to_string()))?;

    if !(200..300).contains(&status) {
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        return Err(StoreError::Http {
            status,
            message: normalize_upstream_error(&body, operation),
        });
    }

    serde_json::from_str(&text).map_err(|err| StoreError::Parse(err.to_string()))
}

async fn expect_success(response: Response, operation: &str) -> Result<(), StoreError> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(());
    }

    let text = response
        .text()
        .await
        .map_err(|err| StoreError::Network(err.to_string()))?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    Err(StoreError::Http {
        status,
        message: normalize_upstream_error(&body, operation),
    })
}

//! Shared types for the client-side auth feature.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Cached copy of the upstream identity. The upstream service owns it; this
/// is transient in-memory state only, never persisted locally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Merge updated fields without dropping anything the server left out.
    pub fn apply(&mut self, patch: &ProfileUpdate) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = Some(avatar_url.clone());
        }
    }
}

/// Payload for public registration. The password never appears in logs or
/// debug output.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub address: String,
    pub role: String,
}

/// Partial profile update; absent fields are left untouched server-side.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Body returned by the relay's credential endpoints. The `user` object is
/// informational; the controller re-derives identity from the cookie.
#[derive(Deserialize, Debug, Clone)]
pub struct LoginOutcome {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Failures raised by the session store accessor.
#[derive(Clone, Debug)]
pub enum StoreError {
    Http { status: u16, message: String },
    Network(String),
    Parse(String),
}

impl StoreError {
    /// The canonical "no session" case: a 401 from the identity fetch.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            Self::Network(message) => write!(formatter, "Network error: {message}"),
            Self::Parse(message) => write!(formatter, "Response error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "u1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Some("seller".to_string()),
            avatar_url: None,
        }
    }

    #[test]
    fn identity_deserializes_camel_case() {
        let value = serde_json::json!({
            "id": "u1",
            "name": "Alice",
            "email": "alice@example.com",
            "role": "agent",
            "avatarUrl": "https://cdn.example/a.png"
        });
        let parsed: Identity = serde_json::from_value(value).expect("identity");
        assert_eq!(parsed.role.as_deref(), Some("agent"));
        assert_eq!(parsed.avatar_url.as_deref(), Some("https://cdn.example/a.png"));
    }

    #[test]
    fn identity_tolerates_missing_role() {
        let value = serde_json::json!({ "id": "u1", "name": "Alice", "email": "a@b.c" });
        let parsed: Identity = serde_json::from_value(value).expect("identity");
        assert_eq!(parsed.role, None);
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut user = identity();
        user.apply(&ProfileUpdate {
            name: Some("Alicia".to_string()),
            ..ProfileUpdate::default()
        });
        assert_eq!(user.name, "Alicia");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role.as_deref(), Some("seller"));
    }

    #[test]
    fn profile_update_skips_absent_fields_on_the_wire() {
        let patch = ProfileUpdate {
            name: Some("Alicia".to_string()),
            ..ProfileUpdate::default()
        };
        let value = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(value, serde_json::json!({ "name": "Alicia" }));
    }

    #[test]
    fn is_unauthenticated_only_for_401() {
        let unauthorized = StoreError::Http {
            status: 401,
            message: "unauthorized".to_string(),
        };
        let server_error = StoreError::Http {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(unauthorized.is_unauthenticated());
        assert!(!server_error.is_unauthenticated());
        assert!(!StoreError::Network("down".to_string()).is_unauthenticated());
    }
}

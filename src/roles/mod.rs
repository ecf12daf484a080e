//! Role normalization and destination zones.
//!
//! The upstream identity service reports roles as an open string space
//! (`buyer`, `seller`, `agent`, `admin`, `superadmin`, or nothing at all).
//! Every authorization decision in the crate goes through this module; raw
//! role strings are never compared directly anywhere else.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of canonical roles used for all authorization decisions.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
    SuperAdmin,
}

/// Protected area of the application a canonical role lands in after
/// authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Buyer,
    Seller,
    Admin,
    SuperAdmin,
}

impl Zone {
    /// Client-side redirect target for the zone.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Buyer => "/buyer",
            Self::Seller => "/seller",
            Self::Admin => "/admin",
            Self::SuperAdmin => "/superadmin",
        }
    }
}

/// Roles accepted through the public registration path.
pub const SELF_SERVICE_ROLES: [&str; 2] = ["buyer", "seller"];

/// Map a raw upstream role string to a canonical role.
///
/// Total and case-insensitive. `agent` is a legacy alias for `Seller`;
/// anything missing or unrecognized falls back to `Buyer` so every identity
/// has a destination.
#[must_use]
pub fn normalize(raw: Option<&str>) -> Role {
    match raw.map(|value| value.trim().to_lowercase()).as_deref() {
        Some("seller" | "agent") => Role::Seller,
        Some("superadmin") => Role::SuperAdmin,
        Some("admin") => Role::Admin,
        _ => Role::Buyer,
    }
}

/// Destination zone for a canonical role.
#[must_use]
pub const fn zone_for(role: Role) -> Zone {
    match role {
        Role::Buyer => Zone::Buyer,
        Role::Seller => Zone::Seller,
        Role::Admin => Zone::Admin,
        Role::SuperAdmin => Zone::SuperAdmin,
    }
}

/// Whether a raw role may be submitted through public registration.
///
/// The privileged tier is rejected here no matter what the upstream would
/// accept, and so is anything outside the known self-service set.
#[must_use]
pub fn registrable(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    SELF_SERVICE_ROLES.contains(&lowered.as_str())
}

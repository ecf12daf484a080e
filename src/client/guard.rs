//! Layout-level route guard. Real access control lives on the API; this is
//! the UX-side redirect decision for protected zones, run on every mount.

use crate::client::controller::{AuthController, AuthPhase};
use crate::roles::{normalize, zone_for, Zone};
use std::sync::Arc;

/// Outcome of a zone check. Callers render nothing protected until the
/// decision resolves; the pending future is the loading placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The identity belongs in this zone.
    Allow,
    /// Authenticated, but this is the wrong zone; send them to theirs.
    Redirect(Zone),
    /// No usable session; the public login entry point wins over any zone.
    RedirectToLogin,
}

pub struct RouteGuard {
    controller: Arc<AuthController>,
    zone: Zone,
}

impl RouteGuard {
    #[must_use]
    pub fn new(controller: Arc<AuthController>, zone: Zone) -> Self {
        Self { controller, zone }
    }

    /// Run the identity check for this mount and decide where the visitor
    /// goes.
    pub async fn decide(&self) -> GuardDecision {
        let snapshot = self.controller.refresh().await;

        match snapshot.phase {
            AuthPhase::Authenticated => {
                let role = snapshot.user.as_ref().and_then(|user| user.role.as_deref());
                let resolved = zone_for(normalize(role));
                if resolved == self.zone {
                    GuardDecision::Allow
                } else {
                    GuardDecision::Redirect(resolved)
                }
            }
            _ => GuardDecision::RedirectToLogin,
        }
    }
}

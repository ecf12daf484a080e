//! Client-side auth feature: session accessor, controller state machine,
//! federation bridge and route guard.

pub mod controller;
pub mod federation;
pub mod guard;
pub mod session;
pub mod types;

pub use controller::{AuthController, AuthPhase, AuthSnapshot, Notifier, TracingNotifier};
pub use federation::{FederationBridge, WidgetHost};
pub use guard::{GuardDecision, RouteGuard};
pub use session::SessionStore;
pub use types::{Identity, LoginOutcome, ProfileUpdate, RegisterRequest, StoreError};

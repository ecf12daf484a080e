//! Role-aware authentication gateway.
//!
//! The gateway relays credentials to an upstream identity service and
//! re-publishes the opaque session cookie it issues; the `client` module is
//! the controller that drives login, registration, federated sign-in and
//! session refresh against the gateway. Role strings are normalized through
//! `roles` before any routing decision.

pub mod cli;
pub mod client;
pub mod gateway;
pub mod roles;

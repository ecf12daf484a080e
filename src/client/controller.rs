//! Auth controller state machine. Holds the only in-memory copy of the
//! authenticated identity; the session cookie stays inside the accessor's
//! jar and is never read here.

use crate::client::session::SessionStore;
use crate::client::types::{Identity, ProfileUpdate, RegisterRequest};
use secrecy::SecretString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Controller phases. `Anonymous` is the canonical "logged out" state, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    Loading,
    Authenticated,
    Anonymous,
    Error,
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<Identity>,
    pub error: Option<String>,
}

impl AuthSnapshot {
    #[must_use]
    pub const fn loading(&self) -> bool {
        matches!(self.phase, AuthPhase::Loading)
    }
}

/// Side channel for user-visible transient notifications, independent of
/// the returned state so callers may ignore it.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Default notifier that routes notifications to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!("{message}");
    }

    fn failure(&self, message: &str) {
        warn!("{message}");
    }
}

struct Inner {
    phase: AuthPhase,
    user: Option<Identity>,
    error: Option<String>,
}

pub struct AuthController {
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<Inner>,
}

impl AuthController {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self::with_notifier(store, Arc::new(TracingNotifier))
    }

    #[must_use]
    pub fn with_notifier(store: SessionStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            inner: Mutex::new(Inner {
                phase: AuthPhase::Idle,
                user: None,
                error: None,
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        let inner = self.lock();
        AuthSnapshot {
            phase: inner.phase,
            user: inner.user.clone(),
            error: inner.error.clone(),
        }
    }

    /// Re-derive the identity from the session cookie. A 401 settles as
    /// `Anonymous` with no error; any other failure clears the cached
    /// identity, since it no longer proves valid.
    pub async fn refresh(&self) -> AuthSnapshot {
        if self.begin().is_none() {
            return self.snapshot();
        }
        self.refresh_inner().await;
        self.snapshot()
    }

    /// Relay login, then re-derive the identity from the now-set cookie.
    /// The login response body is never trusted as the source of identity;
    /// the two upstream calls are strictly sequential.
    pub async fn login(&self, email: &str, password: SecretString) -> AuthSnapshot {
        if self.begin().is_none() {
            return self.snapshot();
        }

        match self.store.login(email, &password).await {
            Ok(_) => {
                self.refresh_inner().await;
                if matches!(self.snapshot().phase, AuthPhase::Authenticated) {
                    self.notifier.success("Signed in");
                } else {
                    self.notifier
                        .failure("Signed in, but the session could not be confirmed");
                }
            }
            Err(err) => {
                let message = err.to_string();
                self.settle_error(message.clone(), false);
                self.notifier.failure(&message);
            }
        }

        self.snapshot()
    }

    /// Relay registration. Does not authenticate; the caller decides where
    /// to send the user next.
    pub async fn register(&self, request: RegisterRequest) -> bool {
        let Some(previous) = self.begin() else {
            return false;
        };

        match self.store.register(&request).await {
            Ok(()) => {
                self.lock().phase = previous;
                self.notifier.success("Account created, you can sign in now");
                true
            }
            Err(err) => {
                let message = err.to_string();
                self.settle_error(message.clone(), false);
                self.notifier.failure(&message);
                false
            }
        }
    }

    /// Exchange a one-time federation credential for a session, then
    /// re-derive the identity. Returns whether the flow authenticated.
    pub async fn federated_login(&self, credential: &str) -> bool {
        if self.begin().is_none() {
            return false;
        }

        match self.store.federated_login(credential).await {
            Ok(_) => {
                self.refresh_inner().await;
                let authenticated =
                    matches!(self.snapshot().phase, AuthPhase::Authenticated);
                if authenticated {
                    self.notifier.success("Signed in");
                } else {
                    self.notifier
                        .failure("Signed in, but the session could not be confirmed");
                }
                authenticated
            }
            Err(err) => {
                let message = err.to_string();
                self.settle_error(message.clone(), false);
                self.notifier.failure(&message);
                false
            }
        }
    }

    /// Best-effort logout: local identity is dropped even when the upstream
    /// call fails, since the user-visible contract is "signed out here".
    pub async fn logout(&self) -> AuthSnapshot {
        if self.begin().is_none() {
            return self.snapshot();
        }

        let outcome = self.store.logout().await;
        {
            let mut inner = self.lock();
            inner.user = None;
            match &outcome {
                Ok(()) => {
                    inner.phase = AuthPhase::Anonymous;
                    inner.error = None;
                }
                Err(err) => {
                    inner.phase = AuthPhase::Error;
                    inner.error = Some(err.to_string());
                }
            }
        }

        match outcome {
            Ok(()) => self.notifier.success("Signed out"),
            Err(err) => self.notifier.failure(&err.to_string()),
        }

        self.snapshot()
    }

    /// Apply a partial profile update, merging returned fields into the
    /// cached identity without dropping anything the server left out.
    pub async fn update_profile(&self, patch: ProfileUpdate) -> AuthSnapshot {
        if self.begin().is_none() {
            return self.snapshot();
        }

        match self.store.update_profile(&patch).await {
            Ok(returned) => {
                {
                    let mut inner = self.lock();
                    if let Some(user) = inner.user.as_mut() {
                        user.apply(&returned);
                    }
                    inner.phase = if inner.user.is_some() {
                        AuthPhase::Authenticated
                    } else {
                        AuthPhase::Anonymous
                    };
                }
                self.notifier.success("Profile updated");
            }
            Err(err) => {
                let message = err.to_string();
                self.settle_error(message.clone(), false);
                self.notifier.failure(&message);
            }
        }

        self.snapshot()
    }

    /// Rotate the password for the current session.
    pub async fn change_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> bool {
        let Some(previous) = self.begin() else {
            return false;
        };

        match self.store.change_password(&current, &new).await {
            Ok(()) => {
                self.lock().phase = previous;
                self.notifier.success("Password changed");
                true
            }
            Err(err) => {
                let message = err.to_string();
                self.settle_error(message.clone(), false);
                self.notifier.failure(&message);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip into `Loading` unless another operation is already running.
    /// Clears any previous error on a successful claim and returns the
    /// prior phase.
    fn begin(&self) -> Option<AuthPhase> {
        let mut inner = self.lock();
        if matches!(inner.phase, AuthPhase::Loading) {
            return None;
        }
        let previous = inner.phase;
        inner.phase = AuthPhase::Loading;
        inner.error = None;
        Some(previous)
    }

    async fn refresh_inner(&self) {
        match self.store.current_identity().await {
            Ok(identity) => {
                let mut inner = self.lock();
                inner.phase = AuthPhase::Authenticated;
                inner.user = Some(identity);
                inner.error = None;
            }
            Err(err) if err.is_unauthenticated() => {
                let mut inner = self.lock();
                inner.phase = AuthPhase::Anonymous;
                inner.user = None;
                inner.error = None;
            }
            Err(err) => self.settle_error(err.to_string(), true),
        }
    }

    fn settle_error(&self, message: String, clear_user: bool) {
        let mut inner = self.lock();
        inner.phase = AuthPhase::Error;
        inner.error = Some(message);
        if clear_user {
            inner.user = None;
        }
    }
}

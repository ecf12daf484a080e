//! Federated sign-in bridge. Loads the third-party widget host, waits for
//! its script to become ready and renders the widget exactly once, feeding
//! the resulting one-time credential into the controller.

use crate::client::controller::AuthController;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::interval};
use tracing::debug;

/// How the bridge talks to the embedding page. Implementations own the
/// script tag bookkeeping and the actual widget rendering; the bridge owns
/// the once-only discipline.
pub trait WidgetHost: Send + Sync {
    /// Whether the third-party script tag is already present (marker id).
    fn script_present(&self) -> bool;

    /// Insert the third-party script tag.
    fn inject_script(&self);

    /// Whether the third-party global has finished loading. Script
    /// execution is asynchronous and unordered relative to mount, so the
    /// bridge polls this.
    fn widget_ready(&self) -> bool;

    /// Render the sign-in widget. Called at most once per bridge; one-time
    /// credentials are delivered through the sender as the user completes
    /// the flow.
    fn render_widget(&self, credentials: mpsc::UnboundedSender<String>);
}

pub struct FederationBridge {
    controller: Arc<AuthController>,
    host: Arc<dyn WidgetHost>,
    client_id: Option<String>,
    poll_interval: Duration,
    rendered: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FederationBridge {
    /// Default readiness poll cadence.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

    #[must_use]
    pub fn new(
        controller: Arc<AuthController>,
        host: Arc<dyn WidgetHost>,
        client_id: Option<String>,
    ) -> Self {
        Self::with_poll_interval(controller, host, client_id, Self::POLL_INTERVAL)
    }

    #[must_use]
    pub fn with_poll_interval(
        controller: Arc<AuthController>,
        host: Arc<dyn WidgetHost>,
        client_id: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            host,
            client_id,
            poll_interval,
            rendered: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Whether federation is configured at all.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.client_id.is_some()
    }

    /// Whether the widget has been rendered.
    #[must_use]
    pub fn widget_rendered(&self) -> bool {
        self.rendered.load(Ordering::SeqCst)
    }

    /// Mount the bridge: inject the script if needed and start polling for
    /// widget readiness. Safe to call repeatedly; the widget renders once
    /// per bridge instance no matter how many mounts race.
    pub fn mount(self: &Arc<Self>) {
        if self.client_id.is_none() {
            // Federation is optional; without a client id there is nothing
            // to load and nothing to poll.
            debug!("federated sign-in disabled: no client id configured");
            return;
        }

        if self.rendered.load(Ordering::SeqCst) {
            return;
        }

        if !self.host.script_present() {
            self.host.inject_script();
        }

        let mut tasks = self.lock_tasks();
        tasks.retain(|task| !task.is_finished());
        if !tasks.is_empty() {
            // A readiness poll is already running.
            return;
        }

        let bridge = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval(bridge.poll_interval);
            loop {
                ticker.tick().await;

                if bridge.rendered.load(Ordering::SeqCst) {
                    break;
                }
                if !bridge.host.widget_ready() {
                    continue;
                }
                if bridge
                    .rendered
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    break;
                }

                // Polling ends here; the task switches to forwarding
                // credentials until the widget's sender is dropped.
                let (sender, mut receiver) = mpsc::unbounded_channel();
                bridge.host.render_widget(sender);
                while let Some(credential) = receiver.recv().await {
                    bridge.controller.federated_login(&credential).await;
                }
                break;
            }
        }));
    }

    /// Tear down: stop the readiness poll and credential forwarding so no
    /// further state updates happen after unmount.
    pub fn unmount(&self) {
        let mut tasks = self.lock_tasks();
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::SessionStore;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    struct MockHost {
        script: AtomicBool,
        injected: AtomicUsize,
        ready: AtomicBool,
        rendered: AtomicUsize,
    }

    impl MockHost {
        fn new() -> Self {
            Self {
                script: AtomicBool::new(false),
                injected: AtomicUsize::new(0),
                ready: AtomicBool::new(false),
                rendered: AtomicUsize::new(0),
            }
        }
    }

    impl WidgetHost for MockHost {
        fn script_present(&self) -> bool {
            self.script.load(Ordering::SeqCst)
        }

        fn inject_script(&self) {
            self.script.store(true, Ordering::SeqCst);
            self.injected.fetch_add(1, Ordering::SeqCst);
        }

        fn widget_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn render_widget(&self, _credentials: mpsc::UnboundedSender<String>) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bridge(host: Arc<MockHost>, client_id: Option<&str>) -> Arc<FederationBridge> {
        let store = SessionStore::new("http://127.0.0.1:1").expect("store");
        let controller = Arc::new(AuthController::new(store));
        Arc::new(FederationBridge::with_poll_interval(
            controller,
            host,
            client_id.map(ToString::to_string),
            Duration::from_millis(5),
        ))
    }

    #[tokio::test]
    async fn renders_widget_once_across_rapid_mounts() {
        let host = Arc::new(MockHost::new());
        let bridge = bridge(host.clone(), Some("client-id.apps.example"));

        // Two mounts land before the third-party script signals readiness.
        bridge.mount();
        bridge.mount();
        assert_eq!(host.rendered.load(Ordering::SeqCst), 0);

        host.ready.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(host.rendered.load(Ordering::SeqCst), 1);
        assert_eq!(host.injected.load(Ordering::SeqCst), 1);
        assert!(bridge.widget_rendered());

        // A later mount after rendering stays a no-op.
        bridge.mount();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(host.rendered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_without_client_id() {
        let host = Arc::new(MockHost::new());
        let bridge = bridge(host.clone(), None);

        assert!(!bridge.enabled());
        bridge.mount();
        host.ready.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(30)).await;

        assert_eq!(host.injected.load(Ordering::SeqCst), 0);
        assert_eq!(host.rendered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmount_stops_the_poll() {
        let host = Arc::new(MockHost::new());
        let bridge = bridge(host.clone(), Some("client-id.apps.example"));

        bridge.mount();
        bridge.unmount();

        host.ready.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(30)).await;

        assert_eq!(host.rendered.load(Ordering::SeqCst), 0);
        assert!(!bridge.widget_rendered());

        // Remounting after teardown picks the poll back up.
        bridge.mount();
        sleep(Duration::from_millis(30)).await;
        assert_eq!(host.rendered.load(Ordering::SeqCst), 1);
    }
}

//! Process start/stop hooks
//!
//! Components register their startup and shutdown work on two signals.
//! `main` fires `on_startup` before serving and `on_shutdown` once the
//! server has drained.

use std::sync::Arc;

use keygate_db::RevocationStore;
use keygate_signal::{fn_receiver, ConnectOptions, Receiver, SenderId, Signal};
use tokio::sync::Mutex;

/// Sender used for process-wide startup
pub const APP_SENDER: &str = "auth-api";

/// Dispatch uid of the revocation store's shutdown hook
pub const REVOCATION_STORE_CLOSE: &str = "revocation_store_close";

/// Dispatch uid of the revocation store's startup ping
pub const REVOCATION_STORE_PING: &str = "revocation_store_ping";

/// Startup and shutdown signals for the service
#[derive(Default)]
pub struct Lifecycle {
    on_startup: Signal<()>,
    on_shutdown: Signal<()>,
    shutdown_senders: Mutex<Vec<SenderId>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_startup(&self) -> &Signal<()> {
        &self.on_startup
    }

    pub fn on_shutdown(&self) -> &Signal<()> {
        &self.on_shutdown
    }

    /// Close `store` at shutdown and ping it at startup.
    ///
    /// Hooks are keyed by the store's type; registering a second store of the
    /// same type is a no-op.
    pub async fn register_revocation_store<T>(&self, store: Arc<T>) -> SenderId
    where
        T: RevocationStore + 'static,
    {
        let sender = SenderId::of::<T>();

        let closing = Arc::clone(&store);
        let close: Arc<dyn Receiver<(), ()>> = fn_receiver(move |_sender, _payload| {
            let store = Arc::clone(&closing);
            async move {
                store.close().await;
                tracing::info!("Revocation store closed");
                Ok(())
            }
        });
        self.on_shutdown
            .connect(
                close,
                ConnectOptions::new()
                    .sender(sender.clone())
                    .strong()
                    .dispatch_uid(REVOCATION_STORE_CLOSE),
            )
            .await;

        let ping: Arc<dyn Receiver<(), ()>> = fn_receiver(move |_sender, _payload| {
            let store = Arc::clone(&store);
            async move {
                store.ping().await?;
                tracing::info!("Revocation store reachable");
                Ok::<_, anyhow::Error>(())
            }
        });
        self.on_startup
            .connect(
                ping,
                ConnectOptions::new().strong().dispatch_uid(REVOCATION_STORE_PING),
            )
            .await;

        let mut senders = self.shutdown_senders.lock().await;
        if !senders.contains(&sender) {
            senders.push(sender.clone());
        }
        sender
    }

    /// Run startup hooks. Returns how many failed.
    pub async fn startup(&self) -> usize {
        let responses = self
            .on_startup
            .send(&SenderId::named(APP_SENDER), ())
            .await;

        responses.iter().filter(|(_, result)| result.is_err()).count()
    }

    /// Run shutdown hooks for every registered component. Returns how many
    /// failed.
    pub async fn shutdown(&self) -> usize {
        let senders = self.shutdown_senders.lock().await.clone();

        let mut failures = 0;
        for sender in &senders {
            let responses = self.on_shutdown.send(sender, ()).await;
            failures += responses.iter().filter(|(_, result)| result.is_err()).count();
        }

        tracing::info!(components = senders.len(), failures, "Shutdown hooks finished");
        failures
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle").finish_non_exhaustive()
    }
}

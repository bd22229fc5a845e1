//! Signal dispatcher
//!
//! Registrations live in an ordered list guarded by an async mutex. When
//! caching is enabled, the receivers resolved for a sender are memoized in a
//! concurrent map that is read without the lock, filled only while the lock
//! is held, and cleared on every connect/disconnect.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Mutex;

use crate::{Receiver, SenderId, SignalError};

/// Outcome of one send: every live receiver paired with its result
pub type Responses<P, R> = Vec<(Arc<dyn Receiver<P, R>>, Result<R, SignalError>)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReceiverKey {
    Uid(String),
    Identity(usize),
}

/// `None` sender means "any sender"
type LookupKey = (ReceiverKey, Option<SenderId>);

enum Handle<P, R> {
    Strong(Arc<dyn Receiver<P, R>>),
    Weak(Weak<dyn Receiver<P, R>>),
}

impl<P, R> Handle<P, R> {
    fn upgrade(&self) -> Option<Arc<dyn Receiver<P, R>>> {
        match self {
            Self::Strong(receiver) => Some(Arc::clone(receiver)),
            Self::Weak(receiver) => receiver.upgrade(),
        }
    }

    fn is_dead(&self) -> bool {
        matches!(self, Self::Weak(receiver) if receiver.strong_count() == 0)
    }
}

impl<P, R> Clone for Handle<P, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Strong(receiver) => Self::Strong(Arc::clone(receiver)),
            Self::Weak(receiver) => Self::Weak(Weak::clone(receiver)),
        }
    }
}

struct Registration<P, R> {
    key: LookupKey,
    handle: Handle<P, R>,
}

enum Cached<P, R> {
    NoReceivers,
    Receivers(Vec<Handle<P, R>>),
}

/// Address of the receiver allocation, shared by every `Arc` clone of it
fn identity<T: ?Sized>(receiver: &Arc<T>) -> usize {
    Arc::as_ptr(receiver).cast::<()>() as usize
}

/// Options for [`Signal::connect`]
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    sender: Option<SenderId>,
    weak: bool,
    dispatch_uid: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            sender: None,
            weak: true,
            dispatch_uid: None,
        }
    }
}

impl ConnectOptions {
    /// Weak registration for every sender
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only receive signals from this sender
    #[must_use]
    pub fn sender(mut self, sender: SenderId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Keep the receiver alive for as long as it is connected
    #[must_use]
    pub fn strong(mut self) -> Self {
        self.weak = false;
        self
    }

    /// Register under a stable uid instead of the receiver's identity
    #[must_use]
    pub fn dispatch_uid(mut self, uid: impl Into<String>) -> Self {
        self.dispatch_uid = Some(uid.into());
        self
    }
}

/// Async signal with per-sender receiver resolution
pub struct Signal<P, R = ()> {
    receivers: Mutex<Vec<Registration<P, R>>>,
    cache: Option<DashMap<SenderId, Cached<P, R>>>,
    dead_receivers: AtomicBool,
}

impl<P, R> Default for Signal<P, R>
where
    P: Send + Sync + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> Signal<P, R>
where
    P: Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create a signal that resolves receivers on every send
    pub fn new() -> Self {
        Self {
            receivers: Mutex::new(Vec::new()),
            cache: None,
            dead_receivers: AtomicBool::new(false),
        }
    }

    /// Create a signal that memoizes resolved receivers per sender
    pub fn with_caching() -> Self {
        Self {
            cache: Some(DashMap::new()),
            ..Self::new()
        }
    }

    /// Register a receiver.
    ///
    /// Returns `false` when a registration with the same lookup key already
    /// exists, in which case nothing changes.
    pub async fn connect(&self, receiver: Arc<dyn Receiver<P, R>>, options: ConnectOptions) -> bool {
        let receiver_key = match options.dispatch_uid {
            Some(uid) => ReceiverKey::Uid(uid),
            None => ReceiverKey::Identity(identity(&receiver)),
        };
        let key = (receiver_key, options.sender);

        let mut receivers = self.receivers.lock().await;
        // A dead entry can share an address with a new receiver
        self.prune_dead(&mut receivers);

        let added = if receivers.iter().any(|r| r.key == key) {
            false
        } else {
            let handle = if options.weak {
                Handle::Weak(Arc::downgrade(&receiver))
            } else {
                Handle::Strong(receiver)
            };
            tracing::debug!(key = ?key, weak = options.weak, "Receiver connected");
            receivers.push(Registration { key, handle });
            true
        };

        self.clear_cache();
        added
    }

    /// Remove the registration made for `receiver` without a dispatch uid
    pub async fn disconnect<T: ?Sized>(&self, receiver: &Arc<T>, sender: Option<&SenderId>) -> bool {
        let key = (ReceiverKey::Identity(identity(receiver)), sender.cloned());
        self.disconnect_key(key).await
    }

    /// Remove the registration made under `dispatch_uid`
    pub async fn disconnect_uid(&self, dispatch_uid: &str, sender: Option<&SenderId>) -> bool {
        let key = (ReceiverKey::Uid(dispatch_uid.to_string()), sender.cloned());
        self.disconnect_key(key).await
    }

    async fn disconnect_key(&self, key: LookupKey) -> bool {
        let mut receivers = self.receivers.lock().await;
        self.prune_dead(&mut receivers);

        let removed = match receivers.iter().position(|r| r.key == key) {
            Some(index) => {
                receivers.remove(index);
                tracing::debug!(key = ?key, "Receiver disconnected");
                true
            }
            None => false,
        };

        self.clear_cache();
        removed
    }

    /// Whether any live receiver would handle a send from `sender`
    pub async fn has_listeners(&self, sender: &SenderId) -> bool {
        !self.live_receivers(sender).await.is_empty()
    }

    /// Number of registrations whose receiver is still alive
    pub async fn receiver_count(&self) -> usize {
        let mut receivers = self.receivers.lock().await;
        self.prune_dead(&mut receivers);
        receivers.len()
    }

    /// Invoke every receiver for `sender` concurrently.
    ///
    /// A receiver that errors or panics does not affect the others; its
    /// failure is returned in its slot.
    pub async fn send(&self, sender: &SenderId, payload: P) -> Responses<P, R> {
        let receivers = self.live_receivers(sender).await;
        if receivers.is_empty() {
            return Vec::new();
        }

        let payload = Arc::new(payload);
        let calls = receivers.iter().map(|receiver| {
            let payload = Arc::clone(&payload);
            async move {
                match AssertUnwindSafe(receiver.receive(sender, payload))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(SignalError::Failed(err)),
                    Err(panic) => Err(SignalError::from_panic(panic)),
                }
            }
        });
        let results = join_all(calls).await;

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            tracing::warn!(sender = %sender, error = %err, "Signal receiver failed");
            metrics::counter!("keygate_signal_receiver_failures_total").increment(1);
        }

        receivers.into_iter().zip(results).collect()
    }

    async fn live_receivers(&self, sender: &SenderId) -> Vec<Arc<dyn Receiver<P, R>>> {
        if !self.dead_receivers.load(Ordering::Acquire) {
            if let Some(live) = self.cached(sender) {
                return live;
            }
        }

        let mut receivers = self.receivers.lock().await;
        if self.dead_receivers.swap(false, Ordering::AcqRel) {
            self.prune_dead(&mut receivers);
        }

        let matching: Vec<Handle<P, R>> = receivers
            .iter()
            .filter(|r| r.key.1.as_ref().map_or(true, |s| s == sender))
            .map(|r| r.handle.clone())
            .collect();

        let live = self.upgrade_all(&matching);

        if let Some(cache) = &self.cache {
            let entry = if matching.is_empty() {
                Cached::NoReceivers
            } else {
                Cached::Receivers(matching)
            };
            cache.insert(sender.clone(), entry);
        }

        live
    }

    fn cached(&self, sender: &SenderId) -> Option<Vec<Arc<dyn Receiver<P, R>>>> {
        let cache = self.cache.as_ref()?;
        let entry = cache.get(sender)?;
        Some(match entry.value() {
            Cached::NoReceivers => Vec::new(),
            Cached::Receivers(handles) => self.upgrade_all(handles),
        })
    }

    fn upgrade_all(&self, handles: &[Handle<P, R>]) -> Vec<Arc<dyn Receiver<P, R>>> {
        let mut live = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.upgrade() {
                Some(receiver) => live.push(receiver),
                None => self.dead_receivers.store(true, Ordering::Release),
            }
        }
        live
    }

    fn prune_dead(&self, receivers: &mut Vec<Registration<P, R>>) {
        let before = receivers.len();
        receivers.retain(|r| !r.handle.is_dead());
        if receivers.len() != before {
            tracing::debug!(pruned = before - receivers.len(), "Pruned dead receivers");
            self.clear_cache();
        }
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

impl<P, R> std::fmt::Debug for Signal<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("use_caching", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

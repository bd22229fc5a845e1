//! Receiver trait and closure adapter

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::SenderId;

/// Something that reacts to a signal.
///
/// `P` is the payload shared by every receiver of one send, `R` the value
/// each receiver hands back to the sender.
#[async_trait]
pub trait Receiver<P, R>: Send + Sync {
    async fn receive(&self, sender: &SenderId, payload: Arc<P>) -> anyhow::Result<R>;
}

/// Adapts an async closure into a [`Receiver`]
pub struct FnReceiver<F> {
    f: F,
}

impl<F> FnReceiver<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<P, R, F, Fut> Receiver<P, R> for FnReceiver<F>
where
    P: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(SenderId, Arc<P>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    async fn receive(&self, sender: &SenderId, payload: Arc<P>) -> anyhow::Result<R> {
        (self.f)(sender.clone(), payload).await
    }
}

impl<F> std::fmt::Debug for FnReceiver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnReceiver").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a shareable receiver.
///
/// The returned `Arc` is the receiver's identity: keep it alive for as long
/// as a weak registration should stay connected.
pub fn fn_receiver<P, R, F, Fut>(f: F) -> Arc<dyn Receiver<P, R>>
where
    P: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(SenderId, Arc<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    Arc::new(FnReceiver::new(f))
}

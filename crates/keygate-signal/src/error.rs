//! Receiver failure types

use thiserror::Error;

/// A single receiver's failure, captured during [`Signal::send`](crate::Signal::send)
#[derive(Error, Debug)]
pub enum SignalError {
    /// Receiver returned an error
    #[error("receiver failed: {0:#}")]
    Failed(anyhow::Error),

    /// Receiver panicked while handling the signal
    #[error("receiver panicked: {0}")]
    Panicked(String),
}

impl SignalError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

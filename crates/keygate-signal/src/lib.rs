//! Keygate Signal - async publish/subscribe for lifecycle hooks
//!
//! A [`Signal`] keeps an ordered list of receivers, each registered under a
//! lookup key built from a dispatch uid (or the receiver's identity) and an
//! optional sender. Sending a signal invokes every matching receiver
//! concurrently and returns one result per receiver.
//!
//! # Example
//!
//! ```rust,ignore
//! use keygate_signal::{fn_receiver, ConnectOptions, SenderId, Signal};
//!
//! struct Store;
//!
//! let on_shutdown: Signal<()> = Signal::new();
//! let close = fn_receiver(|_sender, _payload| async move { Ok(()) });
//!
//! on_shutdown
//!     .connect(
//!         close.clone(),
//!         ConnectOptions::new()
//!             .sender(SenderId::of::<Store>())
//!             .strong()
//!             .dispatch_uid("store_close"),
//!     )
//!     .await;
//!
//! for (_, result) in on_shutdown.send(&SenderId::of::<Store>(), ()).await {
//!     result?;
//! }
//! ```

pub mod error;
pub mod receiver;
pub mod sender;
pub mod signal;

pub use error::SignalError;
pub use receiver::{fn_receiver, FnReceiver, Receiver};
pub use sender::SenderId;
pub use signal::{ConnectOptions, Responses, Signal};

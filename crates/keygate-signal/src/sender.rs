//! Sender identities

use std::any::TypeId;
use std::borrow::Cow;

/// Identity of whoever emits a signal.
///
/// Receivers may subscribe to one sender or to all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SenderId {
    /// A Rust type acting as the sender
    Type { id: TypeId, name: &'static str },
    /// A free-form name
    Named(Cow<'static, str>),
}

impl SenderId {
    /// Sender identity for type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Sender identity from a name
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// Human readable label for logs
    pub fn label(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Named(name) => name,
        }
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

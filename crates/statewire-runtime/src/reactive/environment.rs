#![forbid(unsafe_code)]

//! Type-keyed registry of shared containers.
//!
//! An [`Environment`] lets a scope hand the same container to any number of
//! descendants without threading it through every constructor. Keys are
//! marker types implementing [`EnvironmentKey`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::container::ObservableContainer;

/// Marker type naming an environment slot.
pub trait EnvironmentKey: 'static {
    /// Human-readable key name for logs and errors.
    const NAME: &'static str;
}

/// Errors from environment lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    /// No container was registered under the key.
    Missing { key: &'static str },
}

impl fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "no environment object registered for '{key}'"),
        }
    }
}

impl std::error::Error for EnvironmentError {}

/// Registry of shared containers keyed by marker type.
#[derive(Default, Clone)]
pub struct Environment {
    entries: HashMap<TypeId, (&'static str, ObservableContainer)>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.values().map(|(name, _)| *name).collect();
        keys.sort_unstable();
        f.debug_struct("Environment").field("keys", &keys).finish()
    }
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `container` under `K`, returning the previous entry.
    pub fn insert<K: EnvironmentKey>(
        &mut self,
        container: ObservableContainer,
    ) -> Option<ObservableContainer> {
        debug!(key = K::NAME, "environment object registered");
        self.entries
            .insert(TypeId::of::<K>(), (K::NAME, container))
            .map(|(_, c)| c)
    }

    #[must_use]
    pub fn get<K: EnvironmentKey>(&self) -> Option<ObservableContainer> {
        self.entries.get(&TypeId::of::<K>()).map(|(_, c)| c.clone())
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    pub fn require<K: EnvironmentKey>(&self) -> Result<ObservableContainer, EnvironmentError> {
        self.get::<K>()
            .ok_or(EnvironmentError::Missing { key: K::NAME })
    }

    pub fn remove<K: EnvironmentKey>(&mut self) -> Option<ObservableContainer> {
        self.entries.remove(&TypeId::of::<K>()).map(|(_, c)| c)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#![forbid(unsafe_code)]

//! Owned, create-once state for a scope.
//!
//! [`StateObject<T>`] builds its value lazily on first access and keeps it
//! for the rest of its own lifetime; later accesses never re-run the
//! initializer. Handing the value to someone who should observe it is just
//! a clone of the shared handle ([`observed`](StateObject::observed)); the
//! `StateObject` still decides when the value is created.

use std::cell::OnceCell;
use std::fmt;

/// Lazily created, owned state.
pub struct StateObject<T> {
    value: OnceCell<T>,
    init: Box<dyn Fn() -> T>,
}

impl<T: fmt::Debug> fmt::Debug for StateObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateObject")
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

impl<T> StateObject<T> {
    /// Defer construction to `init`, which runs at most once.
    pub fn new(init: impl Fn() -> T + 'static) -> Self {
        Self {
            value: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// The owned value, created on first call.
    pub fn get(&self) -> &T {
        self.value.get_or_init(|| (self.init)())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// A clone of the value for observers, creating it if needed.
    ///
    /// For shared handle types such as containers the clone points at the
    /// same state, so observers see the owner's mutations.
    pub fn observed(&self) -> T
    where
        T: Clone,
    {
        self.get().clone()
    }
}

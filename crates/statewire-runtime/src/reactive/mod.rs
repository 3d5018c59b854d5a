#![forbid(unsafe_code)]

//! Reactive state for statewire.
//!
//! This module provides change-tracking primitives:
//!
//! - [`ChangeSignal`]: payload-less "something changed" pulse with
//!   wave-scoped de-duplication of forwarded pulses.
//! - [`ObservableContainer`]: named fields behind one change signal, with
//!   explicit forwarding of embedded containers via `embed`.
//! - [`Observable`]: a single version-tracked value cell.
//! - [`Binding`]: two-way handle onto a value owned elsewhere.
//! - [`Environment`]: type-keyed registry of shared containers.
//! - [`StateObject`]: lazily created, owned state.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! Everything is single-threaded: shared state lives in `Rc<RefCell<..>>`
//! and subscribers are stored as `Weak` callbacks, cleaned up lazily when a
//! signal fires. Notification is synchronous; a mutating call returns only
//! after every observer has run.
//!
//! # Invariants
//!
//! 1. A signal fires strictly after the mutation that caused it is applied.
//! 2. Each container mutation fires its own signal exactly once.
//! 3. A forwarded pulse reaches each signal at most once per wave (one
//!    direct fire plus everything forwarded from it); direct fires are
//!    always delivered, re-entrant ones in a single follow-up pass.
//! 4. Forwarding callbacks hold only weak references to the parent.
//! 5. Dropping a [`Subscription`] prevents any further invocation.

pub mod binding;
pub mod container;
pub mod environment;
pub mod observable;
pub mod signal;
pub mod state_object;
pub mod value;

pub use binding::Binding;
pub use container::{ContainerBuilder, FieldError, ObservableContainer};
pub use environment::{Environment, EnvironmentError, EnvironmentKey};
pub use observable::Observable;
pub use signal::{ChangeSignal, ChangeSource, SignalState, Subscription, WeakSignal};
pub use state_object::StateObject;
pub use value::{Record, Value};

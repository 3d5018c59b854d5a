#![forbid(unsafe_code)]

//! Runtime: observable state containers and change propagation.
//!
//! # Role in statewire
//! `statewire-runtime` owns the notification contract. Views (or any other
//! observer) subscribe to a container's change signal and re-read whatever
//! fields they present when it pulses. Nested observable state is wired
//! explicitly with [`ObservableContainer::embed`]; nothing propagates across
//! a container boundary on its own.
//!
//! # Quick start
//!
//! ```
//! use statewire_runtime::{ObservableContainer, Value};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let child = ObservableContainer::with_fields([("count", 0)]);
//! let parent = ObservableContainer::builder()
//!     .field("count", 0)
//!     .embed("child", &child)
//!     .build();
//!
//! let pulses = Rc::new(Cell::new(0));
//! let pulses_clone = Rc::clone(&pulses);
//! let _sub = parent.subscribe(move || pulses_clone.set(pulses_clone.get() + 1));
//!
//! child.set("count", 5);
//! assert_eq!(pulses.get(), 1);
//! assert_eq!(parent.get("count"), Some(Value::Int(0)));
//! assert_eq!(child.get("count"), Some(Value::Int(5)));
//! ```

pub mod reactive;

pub use reactive::{
    Binding, ChangeSignal, ChangeSource, ContainerBuilder, Environment, EnvironmentError,
    EnvironmentKey, FieldError, Observable, ObservableContainer, Record, SignalState,
    StateObject, Subscription, Value, WeakSignal,
};

#![forbid(unsafe_code)]

//! Observable container: named fields behind one change signal.
//!
//! # Design
//!
//! An [`ObservableContainer`] is a shared handle to a map of named fields.
//! A field holds either a value-type [`Value`] or an embedded child
//! container. Every mutation entry point applies the change first and then
//! fires the container's [`ChangeSignal`] synchronously, so observers always
//! read post-mutation state.
//!
//! Change propagation across container boundaries is explicit:
//! [`embed`](ObservableContainer::embed) subscribes the parent to the
//! child's signal once and re-fires the parent's signal from that
//! subscription. The forwarding callback captures only a [`WeakSignal`] to
//! the parent, and the [`Subscription`] keeping it alive is owned by the
//! parent, so ownership flows parent -> child.
//!
//! # Failure Modes
//!
//! - **Mutual or self embedding**: notification terminates (see the wave
//!   rules in [`signal`](super::signal)) but the containers form an `Rc`
//!   cycle and are never freed.
//! - **Borrow during mutation**: calling back into the same container from
//!   the closure passed to [`update`](ObservableContainer::update) or
//!   [`with_field`](ObservableContainer::with_field) panics (RefCell rules).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::signal::{ChangeSignal, ChangeSource, SignalState, Subscription, WeakSignal};
use super::value::{Record, Value};

/// Errors from path-based and in-place field mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The named field does not exist.
    Missing(String),
    /// The path was empty or contained an empty segment.
    InvalidPath(String),
    /// A path segment resolved to a non-record value.
    NotARecord { path: String, kind: &'static str },
    /// The field holds an embedded container; mutate the child directly.
    EmbeddedContainer(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "no field named '{name}'"),
            Self::InvalidPath(path) => write!(f, "invalid field path '{path}'"),
            Self::NotARecord { path, kind } => {
                write!(f, "'{path}' is a {kind} value, not a record")
            }
            Self::EmbeddedContainer(name) => {
                write!(f, "'{name}' is an embedded container")
            }
        }
    }
}

impl std::error::Error for FieldError {}

enum Slot {
    Value(Value),
    Child(ObservableContainer),
}

struct Forward {
    source: WeakSignal,
    _subscription: Subscription,
}

struct ContainerInner {
    fields: RefCell<BTreeMap<String, Slot>>,
    signal: ChangeSignal,
    forwards: RefCell<Vec<Forward>>,
}

/// A shared record of named fields with a single change signal.
///
/// Cloning an `ObservableContainer` creates a new handle to the **same**
/// container.
///
/// # Invariants
///
/// 1. Each mutation fires the signal exactly once, after it is applied.
/// 2. A child's fire re-fires the parent exactly once per wave, so a
///    parent reached along two paths is notified once.
/// 3. A given source is forwarded at most once for the container's
///    lifetime.
#[derive(Clone)]
pub struct ObservableContainer {
    inner: Rc<ContainerInner>,
}

impl Default for ObservableContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservableContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.inner.fields.borrow();
        let mut map = f.debug_map();
        for (name, slot) in fields.iter() {
            match slot {
                Slot::Value(v) => map.entry(name, v),
                // Children print shallowly; embedding graphs may be cyclic.
                Slot::Child(c) => map.entry(name, &format!("<container v{}>", c.version())),
            };
        }
        map.finish()
    }
}

impl ObservableContainer {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                fields: RefCell::new(BTreeMap::new()),
                signal: ChangeSignal::new(),
                forwards: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a container with initial value fields. No signal fires.
    #[must_use]
    pub fn with_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let container = Self::new();
        {
            let mut slots = container.inner.fields.borrow_mut();
            for (name, value) in fields {
                slots.insert(name.into(), Slot::Value(value.into()));
            }
        }
        container
    }

    /// Start building a container with fields and embedded children.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder {
            container: Self::new(),
        }
    }

    /// Insert or replace a value field, then fire the change signal.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), Slot::Value(value.into()));
        self.inner.signal.fire();
    }

    /// Clone of a value field. `None` for missing fields and embedded
    /// containers.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.inner.fields.borrow().get(name)? {
            Slot::Value(v) => Some(v.clone()),
            Slot::Child(_) => None,
        }
    }

    /// Integer value of a field, if it holds one.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.with_field(name, Value::as_int).flatten()
    }

    /// Borrow a value field without cloning.
    pub fn with_field<R>(&self, name: &str, f: impl FnOnce(&Value) -> R) -> Option<R> {
        match self.inner.fields.borrow().get(name)? {
            Slot::Value(v) => Some(f(v)),
            Slot::Child(_) => None,
        }
    }

    /// Resolve a dotted path through value-type records and embedded
    /// children.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let fields = self.inner.fields.borrow();
        match (fields.get(head)?, rest) {
            (Slot::Value(v), None) => Some(v.clone()),
            (Slot::Value(v), Some(rest)) => v.as_record()?.get_path(rest).cloned(),
            (Slot::Child(_), None) => None,
            (Slot::Child(child), Some(rest)) => child.get_path(rest),
        }
    }

    /// Mutate a value field in place, then fire once.
    pub fn update(&self, name: &str, f: impl FnOnce(&mut Value)) -> Result<(), FieldError> {
        {
            let mut fields = self.inner.fields.borrow_mut();
            match fields.get_mut(name) {
                Some(Slot::Value(v)) => f(v),
                Some(Slot::Child(_)) => return Err(FieldError::EmbeddedContainer(name.to_owned())),
                None => return Err(FieldError::Missing(name.to_owned())),
            }
        }
        self.inner.signal.fire();
        Ok(())
    }

    /// Assign a value nested inside value-type records, creating
    /// intermediate records as needed, then fire once.
    ///
    /// A single-segment path behaves like [`set`](Self::set).
    pub fn set_path(&self, path: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(FieldError::InvalidPath(path.to_owned()));
        }
        let (head, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Err(FieldError::InvalidPath(path.to_owned())),
        };
        {
            let mut fields = self.inner.fields.borrow_mut();
            if rest.is_empty() {
                fields.insert((*head).to_owned(), Slot::Value(value.into()));
            } else {
                let slot = fields
                    .entry((*head).to_owned())
                    .or_insert_with(|| Slot::Value(Value::Record(Record::new())));
                let root = match slot {
                    Slot::Child(_) => {
                        return Err(FieldError::EmbeddedContainer((*head).to_owned()));
                    }
                    Slot::Value(v) => v,
                };
                assign_nested(root, head, rest, value.into())?;
            }
        }
        self.inner.signal.fire();
        Ok(())
    }

    /// Remove a field. Fires only if something was removed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.inner.fields.borrow_mut().remove(name).is_some();
        if removed {
            self.inner.signal.fire();
        }
        removed
    }

    /// Whether a field (value or child) exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.fields.borrow().contains_key(name)
    }

    /// Field names in name order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Register a pulse observer.
    pub fn subscribe(&self, observer: impl Fn() + 'static) -> Subscription {
        let sub = self.inner.signal.subscribe(observer);
        debug!(
            subscribers = self.inner.signal.subscriber_count(),
            "container subscriber added"
        );
        sub
    }

    /// Store `child` under `name` and forward its change signal.
    ///
    /// The forwarding subscription is created once per distinct child, no
    /// matter how many names the child is embedded under. Embedding does not
    /// itself fire. Returns the child handle.
    pub fn embed(&self, name: &str, child: &ObservableContainer) -> ObservableContainer {
        self.inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), Slot::Child(child.clone()));
        let wired = self.forward_from(child);
        debug!(field = name, wired, "embedded child container");
        child.clone()
    }

    /// Embedded child container stored under `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<ObservableContainer> {
        match self.inner.fields.borrow().get(name)? {
            Slot::Child(c) => Some(c.clone()),
            Slot::Value(_) => None,
        }
    }

    /// Re-fire this container's signal whenever `source` fires.
    ///
    /// Returns `false` if `source` is already forwarded (or is this
    /// container's own signal); no second subscription is created.
    pub fn forward_from(&self, source: &impl ChangeSource) -> bool {
        let source = source.change_signal();
        if source.ptr_eq(&self.inner.signal) {
            return false;
        }
        let mut forwards = self.inner.forwards.borrow_mut();
        forwards.retain(|f| !f.source.is_dead());
        if forwards.iter().any(|f| f.source.points_to(&source)) {
            return false;
        }
        let parent = self.inner.signal.downgrade();
        let subscription = source.subscribe(move || {
            if let Some(parent) = parent.upgrade() {
                parent.relay();
            }
        });
        forwards.push(Forward {
            source: source.downgrade(),
            _subscription: subscription,
        });
        true
    }

    /// Number of sources this container forwards.
    #[must_use]
    pub fn forward_count(&self) -> usize {
        self.inner
            .forwards
            .borrow()
            .iter()
            .filter(|f| !f.source.is_dead())
            .count()
    }

    /// Number of delivered change notifications.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.signal.version()
    }

    /// `Notifying` while subscriber callbacks run, `Clean` otherwise.
    #[must_use]
    pub fn state(&self) -> SignalState {
        self.inner.signal.state()
    }

    /// Registered subscribers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.signal.subscriber_count()
    }

    /// Whether both handles refer to the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Deep copy of all fields. Embedded children become nested records;
    /// a child already being snapshotted higher up the chain becomes
    /// `Value::Unit`.
    #[must_use]
    pub fn snapshot(&self) -> Record {
        let mut visiting = Vec::new();
        self.snapshot_inner(&mut visiting)
    }

    fn snapshot_inner(&self, visiting: &mut Vec<*const ContainerInner>) -> Record {
        let me = Rc::as_ptr(&self.inner);
        visiting.push(me);
        let mut record = Record::new();
        for (name, slot) in self.inner.fields.borrow().iter() {
            let value = match slot {
                Slot::Value(v) => v.clone(),
                Slot::Child(child) if visiting.contains(&Rc::as_ptr(&child.inner)) => Value::Unit,
                Slot::Child(child) => Value::Record(child.snapshot_inner(visiting)),
            };
            record.insert(name.as_str(), value);
        }
        visiting.pop();
        record
    }

    /// Snapshot serialized as a JSON object.
    #[cfg(feature = "serde")]
    pub fn snapshot_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.snapshot())
    }
}

impl ChangeSource for ObservableContainer {
    fn change_signal(&self) -> ChangeSignal {
        self.inner.signal.clone()
    }
}

fn assign_nested(
    root: &mut Value,
    head: &str,
    rest: &[&str],
    value: Value,
) -> Result<(), FieldError> {
    let mut current = root;
    let mut walked = head.to_owned();
    for (i, segment) in rest.iter().enumerate() {
        let kind = current.kind();
        let record = current.as_record_mut().ok_or_else(|| FieldError::NotARecord {
            path: walked.clone(),
            kind,
        })?;
        if i + 1 == rest.len() {
            record.insert(*segment, value);
            return Ok(());
        }
        walked.push('.');
        walked.push_str(segment);
        let next = record.entry(segment);
        if matches!(next, Value::Unit) {
            *next = Value::Record(Record::new());
        }
        current = next;
    }
    Ok(())
}

/// Builder for containers with initial fields and embedded children.
///
/// Children added here are wired exactly like
/// [`ObservableContainer::embed`]; nothing fires during construction.
#[derive(Debug)]
pub struct ContainerBuilder {
    container: ObservableContainer,
}

impl ContainerBuilder {
    /// Add an initial value field.
    #[must_use]
    pub fn field(self, name: &str, value: impl Into<Value>) -> Self {
        self.container
            .inner
            .fields
            .borrow_mut()
            .insert(name.to_owned(), Slot::Value(value.into()));
        self
    }

    /// Embed a child container.
    #[must_use]
    pub fn embed(self, name: &str, child: &ObservableContainer) -> Self {
        self.container.embed(name, child);
        self
    }

    /// Forward an arbitrary change source.
    #[must_use]
    pub fn forward(self, source: &impl ChangeSource) -> Self {
        self.container.forward_from(source);
        self
    }

    #[must_use]
    pub fn build(self) -> ObservableContainer {
        self.container
    }
}

#![forbid(unsafe_code)]

//! Two-way bindings onto a source of truth stored elsewhere.
//!
//! A [`Binding<T>`] owns no state. Reads and writes go straight to the
//! source, so writing through a binding notifies the source's observers
//! exactly as a direct write would.

use std::rc::Rc;

use super::container::ObservableContainer;
use super::observable::Observable;
use super::value::Value;

/// A get/set handle onto a value owned by someone else.
pub struct Binding<T> {
    get: Rc<dyn Fn() -> T>,
    set: Rc<dyn Fn(T)>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            get: Rc::clone(&self.get),
            set: Rc::clone(&self.set),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("value", &(self.get)())
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Build a binding from a getter and a setter.
    pub fn new(get: impl Fn() -> T + 'static, set: impl Fn(T) + 'static) -> Self {
        Self {
            get: Rc::new(get),
            set: Rc::new(set),
        }
    }

    /// A binding that always reads `value` and ignores writes.
    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move || value.clone(), |_| {})
    }

    #[must_use]
    pub fn get(&self) -> T {
        (self.get)()
    }

    pub fn set(&self, value: T) {
        (self.set)(value);
    }

    /// Read, modify, write back. One write, so one notification.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Bind to an [`Observable`].
    #[must_use]
    pub fn from_observable(source: &Observable<T>) -> Self {
        let reader = source.clone();
        let writer = source.clone();
        Self::new(move || reader.get(), move |v| writer.set(v))
    }
}

impl Binding<Value> {
    /// Bind to a container field. Missing fields read as `Value::Unit`.
    #[must_use]
    pub fn field(container: &ObservableContainer, name: &str) -> Self {
        let reader = container.clone();
        let writer = container.clone();
        let read_name = name.to_owned();
        let write_name = name.to_owned();
        Self::new(
            move || reader.get(&read_name).unwrap_or_default(),
            move |v| writer.set(&write_name, v),
        )
    }
}

impl Binding<i64> {
    /// Bind to an integer field, or to an integer nested in value-type
    /// records when `path` is dotted. Non-integer values read as 0.
    #[must_use]
    pub fn int_field(container: &ObservableContainer, path: &str) -> Self {
        let reader = container.clone();
        let writer = container.clone();
        let read_path = path.to_owned();
        let write_path = path.to_owned();
        Self::new(
            move || {
                reader
                    .get_path(&read_path)
                    .and_then(|v| v.as_int())
                    .unwrap_or(0)
            },
            move |v| {
                if let Err(err) = writer.set_path(&write_path, v) {
                    tracing::warn!(path = %write_path, %err, "binding write rejected");
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Record;
    use std::cell::Cell;

    #[test]
    fn observable_binding_writes_through() {
        let source = Observable::new(1);
        let binding = Binding::from_observable(&source);
        binding.set(5);
        assert_eq!(source.get(), 5);
        binding.update(|v| *v += 1);
        assert_eq!(source.get(), 6);
        assert_eq!(binding.get(), 6);
    }

    #[test]
    fn int_field_binding_notifies_container_once() {
        let container = ObservableContainer::new();
        container.set("model", Record::new().with("count", 0));
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _sub = container.subscribe(move || count_clone.set(count_clone.get() + 1));

        let binding = Binding::int_field(&container, "model.count");
        binding.update(|v| *v += 1);
        assert_eq!(binding.get(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn rejected_write_leaves_container_untouched() {
        let container = ObservableContainer::with_fields([("count", 3)]);
        let binding = Binding::int_field(&container, "count.inner");
        binding.set(1);
        assert_eq!(container.version(), 0);
        assert_eq!(binding.get(), 0);
    }

    #[test]
    fn field_binding_reads_unit_when_missing() {
        let container = ObservableContainer::new();
        let binding = Binding::field(&container, "name");
        assert_eq!(binding.get(), Value::Unit);
        binding.set(Value::from("statewire"));
        assert_eq!(container.get("name"), Some(Value::from("statewire")));
    }

    #[test]
    fn constant_ignores_writes() {
        let binding = Binding::constant(7);
        binding.set(1);
        assert_eq!(binding.get(), 7);
    }
}

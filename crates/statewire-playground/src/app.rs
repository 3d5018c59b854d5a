#![forbid(unsafe_code)]

//! Playground model: the view model and the content view that owns it.

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use statewire_runtime::{
    Binding, ChangeSignal, ChangeSource, Environment, EnvironmentKey, Observable,
    ObservableContainer, Record, StateObject, Value,
};
use tracing::debug;

/// Field name shared by every counter.
pub const NUMBER_OF_TIMES: &str = "number_of_times";
/// View model field holding the value-type record.
pub const STRUCT_MODEL: &str = "struct_model";
/// View model field holding the embedded child container.
pub const CLASS_MODEL: &str = "class_model";

/// One of the playground's four counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// View-local state.
    State,
    /// Plain field of the view model.
    ViewModel,
    /// Field of a value-type record inside the view model.
    StructModel,
    /// Field of a child container embedded in the view model.
    ClassModel,
}

impl Counter {
    /// All counters in display order.
    pub const ALL: [Counter; 4] = [
        Counter::State,
        Counter::ViewModel,
        Counter::StructModel,
        Counter::ClassModel,
    ];

    /// Caption shown above the counter.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::State => "@State",
            Self::ViewModel => "@StateObject ViewModel + Type",
            Self::StructModel => "@StateObject VM + Struct",
            Self::ClassModel => "@StateObject VM + Class",
        }
    }

    /// Short name accepted on the command line.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::ViewModel => "vm",
            Self::StructModel => "struct",
            Self::ClassModel => "class",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Counter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "vm" | "viewmodel" | "view_model" => Ok(Self::ViewModel),
            "struct" => Ok(Self::StructModel),
            "class" => Ok(Self::ClassModel),
            other => Err(format!(
                "unknown counter '{other}' (expected state, vm, struct, or class)"
            )),
        }
    }
}

/// Environment key under which the view model container is published.
pub struct ViewModelKey;

impl EnvironmentKey for ViewModelKey {
    const NAME: &'static str = "view_model";
}

/// Root view model.
///
/// `class_model` is a separate container; its changes reach observers of
/// the view model only because construction embeds it.
#[derive(Debug, Clone)]
pub struct ViewModel {
    container: ObservableContainer,
    class_model: ObservableContainer,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    #[must_use]
    pub fn new() -> Self {
        let class_model = ObservableContainer::with_fields([(NUMBER_OF_TIMES, 0)]);
        let container = ObservableContainer::builder()
            .field(NUMBER_OF_TIMES, 0)
            .field(STRUCT_MODEL, Record::new().with(NUMBER_OF_TIMES, 0))
            .embed(CLASS_MODEL, &class_model)
            .build();
        debug!("view model constructed");
        Self {
            container,
            class_model,
        }
    }

    /// The view model's own container.
    #[must_use]
    pub fn container(&self) -> &ObservableContainer {
        &self.container
    }

    /// The embedded child container.
    #[must_use]
    pub fn class_model(&self) -> &ObservableContainer {
        &self.class_model
    }

    /// Binding to one of the view model's counters. `Counter::State` is not
    /// owned by the view model and yields `None`.
    #[must_use]
    pub fn binding(&self, counter: Counter) -> Option<Binding<i64>> {
        match counter {
            Counter::State => None,
            Counter::ViewModel => Some(Binding::int_field(&self.container, NUMBER_OF_TIMES)),
            Counter::StructModel => Some(Binding::int_field(
                &self.container,
                &format!("{STRUCT_MODEL}.{NUMBER_OF_TIMES}"),
            )),
            Counter::ClassModel => Some(Binding::int_field(&self.class_model, NUMBER_OF_TIMES)),
        }
    }
}

impl ChangeSource for ViewModel {
    fn change_signal(&self) -> ChangeSignal {
        self.container.change_signal()
    }
}

/// The playground view: a local counter plus an owned view model.
///
/// The view model is created on first use, and the environment that
/// publishes it is filled at the same time.
pub struct ContentView {
    number_of_times: Observable<i64>,
    view_model: StateObject<ViewModel>,
    environment: OnceCell<Environment>,
}

impl Default for ContentView {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentView")
            .field("number_of_times", &self.number_of_times.get())
            .field("view_model", &self.view_model)
            .finish()
    }
}

impl ContentView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            number_of_times: Observable::new(0),
            view_model: StateObject::new(ViewModel::new),
            environment: OnceCell::new(),
        }
    }

    /// View-local counter.
    #[must_use]
    pub fn local_state(&self) -> &Observable<i64> {
        &self.number_of_times
    }

    #[must_use]
    pub fn view_model(&self) -> &ViewModel {
        self.view_model.get()
    }

    /// Whether anything has touched the view model yet.
    #[must_use]
    pub fn is_view_model_created(&self) -> bool {
        self.view_model.is_initialized()
    }

    /// Objects published to descendants.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        self.environment.get_or_init(|| {
            let mut environment = Environment::new();
            environment.insert::<ViewModelKey>(self.view_model().container().clone());
            environment
        })
    }

    /// Two-way binding to any counter.
    #[must_use]
    pub fn binding(&self, counter: Counter) -> Binding<i64> {
        let local = || Binding::from_observable(&self.number_of_times);
        if counter == Counter::State {
            return local();
        }
        self.view_model().binding(counter).unwrap_or_else(local)
    }

    /// Press the button under `counter`.
    pub fn press(&self, counter: Counter) {
        debug!(%counter, "button pressed");
        self.binding(counter).update(|n| *n += 1);
    }

    #[must_use]
    pub fn count(&self, counter: Counter) -> i64 {
        self.binding(counter).get()
    }

    /// Text presentation of every counter group.
    #[must_use]
    pub fn view_string(&self) -> String {
        Counter::ALL
            .iter()
            .map(|&c| format!("{:<32}{:>4}", c.label(), self.count(c)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full state: the local counter plus the view model tree.
    #[must_use]
    pub fn snapshot(&self) -> Record {
        Record::new()
            .with("state", Value::Int(self.number_of_times.get()))
            .with("view_model", self.view_model().container().snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn counter_parsing() {
        for c in Counter::ALL {
            assert_eq!(c.key().parse::<Counter>(), Ok(c));
        }
        assert_eq!("ViewModel".parse::<Counter>(), Ok(Counter::ViewModel));
        assert!("button".parse::<Counter>().is_err());
    }

    #[test]
    fn press_increments_only_that_counter() {
        let view = ContentView::new();
        view.press(Counter::StructModel);
        view.press(Counter::StructModel);
        view.press(Counter::ClassModel);

        assert_eq!(view.count(Counter::State), 0);
        assert_eq!(view.count(Counter::ViewModel), 0);
        assert_eq!(view.count(Counter::StructModel), 2);
        assert_eq!(view.count(Counter::ClassModel), 1);
    }

    #[test]
    fn class_model_changes_reach_view_model_observers() {
        let vm = ViewModel::new();
        let pulses = Rc::new(Cell::new(0u32));
        let pulses_clone = Rc::clone(&pulses);
        let _sub = vm
            .change_signal()
            .subscribe(move || pulses_clone.set(pulses_clone.get() + 1));

        vm.class_model().set(NUMBER_OF_TIMES, 5);
        assert_eq!(pulses.get(), 1);
        assert_eq!(vm.container().get_int(NUMBER_OF_TIMES), Some(0));
    }

    #[test]
    fn view_model_is_created_on_first_use() {
        let view = ContentView::new();
        view.press(Counter::State);
        assert_eq!(view.count(Counter::State), 1);
        assert!(!view.is_view_model_created());
        assert!(format!("{view:?}").contains("None"));

        view.press(Counter::ViewModel);
        assert!(view.is_view_model_created());
        let first = view.view_model().container().clone();
        assert!(view.environment().require::<ViewModelKey>().unwrap().ptr_eq(&first));
        assert!(view.view_model().container().ptr_eq(&first));
    }

    #[test]
    fn environment_publishes_view_model() {
        let view = ContentView::new();
        let published = view.environment().require::<ViewModelKey>().unwrap();
        assert!(published.ptr_eq(view.view_model().container()));
    }

    #[test]
    fn view_string_lists_every_group() {
        let view = ContentView::new();
        view.press(Counter::State);
        let text = view.view_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().next().unwrap().starts_with("@State"));
        assert!(text.lines().next().unwrap().ends_with('1'));
    }

    #[test]
    fn snapshot_nests_class_model() {
        let view = ContentView::new();
        view.press(Counter::ClassModel);
        let snap = view.snapshot();
        assert_eq!(
            snap.get_path("view_model.class_model.number_of_times"),
            Some(&Value::Int(1))
        );
        assert_eq!(snap.get("state"), Some(&Value::Int(0)));
    }
}

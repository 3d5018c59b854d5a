#![forbid(unsafe_code)]

//! Headless renderer: re-reads the view after change pulses.
//!
//! The renderer never inspects what changed. A pulse only marks it dirty;
//! the next [`frame`](Renderer::frame) call re-reads the whole view.

use std::cell::Cell;
use std::rc::Rc;

use statewire_runtime::{EnvironmentError, Subscription};
use tracing::info;

use crate::app::{ContentView, ViewModelKey};

/// Dirty-tracking text renderer for a [`ContentView`].
#[derive(Debug)]
pub struct Renderer {
    dirty: Rc<Cell<bool>>,
    pulses: Rc<Cell<u64>>,
    renders: u64,
    last_frame: String,
    _subscriptions: Vec<Subscription>,
}

impl Renderer {
    /// Subscribe to the view's local state and to the view model published
    /// in its environment. The first frame is always rendered.
    pub fn attach(view: &ContentView) -> Result<Self, EnvironmentError> {
        let root = view.environment().require::<ViewModelKey>()?;
        let dirty = Rc::new(Cell::new(true));
        let pulses = Rc::new(Cell::new(0u64));

        let mark = {
            let dirty = Rc::clone(&dirty);
            let pulses = Rc::clone(&pulses);
            move || {
                dirty.set(true);
                pulses.set(pulses.get() + 1);
            }
        };
        let subscriptions = vec![
            root.subscribe(mark.clone()),
            view.local_state().subscribe_pulse(mark),
        ];

        Ok(Self {
            dirty,
            pulses,
            renders: 0,
            last_frame: String::new(),
            _subscriptions: subscriptions,
        })
    }

    /// Re-render if a pulse arrived since the last frame. Returns the new
    /// frame, or `None` when nothing changed.
    pub fn frame(&mut self, view: &ContentView) -> Option<&str> {
        if !self.dirty.replace(false) {
            return None;
        }
        self.last_frame = view.view_string();
        self.renders += 1;
        info!(
            renders = self.renders,
            pulses = self.pulses.get(),
            "frame rendered"
        );
        Some(&self.last_frame)
    }

    #[must_use]
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Change pulses received so far.
    #[must_use]
    pub fn pulse_count(&self) -> u64 {
        self.pulses.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Counter;

    #[test]
    fn first_frame_always_renders() {
        let view = ContentView::new();
        let mut renderer = Renderer::attach(&view).unwrap();
        assert!(renderer.frame(&view).is_some());
        assert!(renderer.frame(&view).is_none());
        assert_eq!(renderer.render_count(), 1);
    }

    #[test]
    fn every_counter_triggers_exactly_one_pulse() {
        let view = ContentView::new();
        let mut renderer = Renderer::attach(&view).unwrap();
        renderer.frame(&view);

        for (i, counter) in Counter::ALL.into_iter().enumerate() {
            view.press(counter);
            assert_eq!(renderer.pulse_count(), i as u64 + 1, "{counter}");
            assert!(renderer.frame(&view).is_some());
        }
        assert_eq!(renderer.render_count(), 5);
    }

    #[test]
    fn pulses_between_frames_coalesce() {
        let view = ContentView::new();
        let mut renderer = Renderer::attach(&view).unwrap();
        renderer.frame(&view);

        view.press(Counter::ViewModel);
        view.press(Counter::ClassModel);
        assert!(renderer.is_dirty());
        let frame = renderer.frame(&view).unwrap().to_string();
        assert!(frame.contains("@StateObject VM + Class"));
        assert_eq!(renderer.pulse_count(), 2);
        assert_eq!(renderer.render_count(), 2);
    }

    #[test]
    fn unembedded_child_would_not_reach_renderer() {
        let view = ContentView::new();
        let mut renderer = Renderer::attach(&view).unwrap();
        renderer.frame(&view);

        // A container the view model never embedded.
        let stray = statewire_runtime::ObservableContainer::with_fields([("n", 0)]);
        stray.set("n", 1);
        assert!(!renderer.is_dirty());
        assert_eq!(renderer.pulse_count(), 0);
    }
}

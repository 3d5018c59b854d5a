#![forbid(unsafe_code)]

//! Payload-less change signal with wave-scoped de-duplication.
//!
//! # Design
//!
//! [`ChangeSignal`] is the "something changed" pulse shared by every
//! observable type in this module. Subscribers are plain `Fn()` closures
//! stored as `Weak` references; the strong `Rc` lives in the
//! [`Subscription`] guard handed back to the caller.
//!
//! # Waves
//!
//! Every direct [`fire`](ChangeSignal::fire) starts a new *wave*. Pulses
//! relayed through forwarding subscriptions carry the wave of the fire that
//! caused them, and a signal delivers each wave at most once. Cyclic
//! forwarding graphs stay finite and diamond-shaped graphs notify each
//! signal exactly once per wave.
//!
//! Direct fires are never dropped for having happened "recently". A direct
//! fire (or a relayed pulse from a different wave) that arrives while the
//! signal's own subscribers are still running is queued, and the signal
//! delivers it in a single extra pass once the current pass returns. Fires
//! arriving during that extra pass are suppressed and counted.
//!
//! # Failure Modes
//!
//! - **Cyclic forwarding**: terminates (a wave never re-enters a signal) but
//!   the containers involved keep each other alive.
//! - **Observers that always write back**: bounded to one queued redelivery
//!   per outer fire.
//! - **Panicking subscriber**: the current wave, the `Notifying` state and
//!   any queued redelivery are all unwound by drop guards, so later
//!   mutations behave normally.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

type PulseRc = Rc<dyn Fn()>;
type PulseWeak = Weak<dyn Fn()>;

thread_local! {
    static NEXT_WAVE: Cell<u64> = const { Cell::new(0) };
    static CURRENT_WAVE: Cell<Option<u64>> = const { Cell::new(None) };
}

fn next_wave() -> u64 {
    NEXT_WAVE.with(|next| {
        let wave = next.get().wrapping_add(1);
        next.set(wave);
        wave
    })
}

/// Marks `wave` as the one being delivered on this thread until dropped.
struct WaveGuard {
    previous: Option<u64>,
}

impl WaveGuard {
    fn enter(wave: u64) -> Self {
        Self {
            previous: CURRENT_WAVE.with(|current| current.replace(Some(wave))),
        }
    }
}

impl Drop for WaveGuard {
    fn drop(&mut self) {
        CURRENT_WAVE.with(|current| current.set(self.previous));
    }
}

/// Logical notification state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    /// No notification in progress.
    #[default]
    Clean,
    /// A mutation was applied and subscribers are being informed.
    Notifying,
}

struct SignalInner {
    version: u64,
    state: SignalState,
    last_wave: Option<u64>,
    pending: bool,
    redelivering: bool,
    suppressed: u64,
    subscribers: Vec<PulseWeak>,
}

/// A shared, payload-less change signal.
///
/// Cloning a `ChangeSignal` creates another handle to the **same** signal.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 per delivered pass.
/// 2. Subscribers are notified in registration order.
/// 3. A forwarded wave is delivered at most once.
/// 4. A direct fire is always delivered, immediately or in the single
///    redelivery pass that follows a re-entrant fire.
/// 5. `state()` reads `Notifying` only while subscriber callbacks run.
#[derive(Clone)]
pub struct ChangeSignal {
    inner: Rc<RefCell<SignalInner>>,
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ChangeSignal")
            .field("version", &inner.version)
            .field("state", &inner.state)
            .field("suppressed", &inner.suppressed)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

/// Resets the signal to `Clean` when a pass ends, even on unwind.
struct NotifyingGuard<'a> {
    inner: &'a RefCell<SignalInner>,
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.state = SignalState::Clean;
        if std::thread::panicking() {
            inner.pending = false;
        }
    }
}

/// Clears the redelivery flag when the extra pass ends, even on unwind.
struct RedeliveryGuard<'a> {
    inner: &'a RefCell<SignalInner>,
}

impl Drop for RedeliveryGuard<'_> {
    fn drop(&mut self) {
        self.inner.borrow_mut().redelivering = false;
    }
}

impl ChangeSignal {
    /// Create a signal with no subscribers at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                version: 0,
                state: SignalState::Clean,
                last_wave: None,
                pending: false,
                redelivering: false,
                suppressed: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Register a pulse observer.
    ///
    /// The observer stays registered until the returned [`Subscription`] is
    /// dropped or [`unsubscribe`](Subscription::unsubscribe)d.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        let strong: PulseRc = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Fire the signal as a direct mutation, notifying every live subscriber.
    ///
    /// Returns `false` if the signal was already notifying. The fire is then
    /// queued and delivered after the current pass, or suppressed if that
    /// pass is itself the redelivery.
    pub fn fire(&self) -> bool {
        self.fire_with(|| {})
    }

    /// Direct fire that runs `before_pulse` ahead of the pulse subscribers
    /// on every delivered pass.
    pub(crate) fn fire_with(&self, before_pulse: impl Fn()) -> bool {
        if self.defer_if_notifying() {
            return false;
        }
        self.deliver(next_wave(), &before_pulse);
        self.redeliver_pending(&before_pulse);
        true
    }

    /// Re-fire on behalf of a forwarded source.
    ///
    /// The pulse joins the wave currently being delivered and is dropped if
    /// this signal already saw that wave.
    pub(crate) fn relay(&self) -> bool {
        let wave = CURRENT_WAVE.with(Cell::get).unwrap_or_else(next_wave);
        {
            let mut inner = self.inner.borrow_mut();
            if inner.last_wave == Some(wave) {
                inner.suppressed += 1;
                trace!(
                    wave,
                    suppressed = inner.suppressed,
                    "forwarded change already delivered"
                );
                return false;
            }
        }
        if self.defer_if_notifying() {
            return false;
        }
        self.deliver(wave, &|| {});
        self.redeliver_pending(&|| {});
        true
    }

    fn defer_if_notifying(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.state != SignalState::Notifying {
            return false;
        }
        if inner.redelivering {
            inner.suppressed += 1;
            trace!(
                version = inner.version,
                suppressed = inner.suppressed,
                "re-entrant change during redelivery suppressed"
            );
        } else {
            inner.pending = true;
            trace!(version = inner.version, "re-entrant change queued");
        }
        true
    }

    fn deliver(&self, wave: u64, before_pulse: &dyn Fn()) {
        let callbacks: Vec<PulseRc> = {
            let mut inner = self.inner.borrow_mut();
            inner.last_wave = Some(wave);
            inner.version += 1;
            inner.state = SignalState::Notifying;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            trace!(
                wave,
                version = inner.version,
                subscribers = inner.subscribers.len(),
                "change signal fired"
            );
            inner
                .subscribers
                .iter()
                .filter_map(|w| w.upgrade())
                .collect()
        };

        let _wave = WaveGuard::enter(wave);
        let _notifying = NotifyingGuard { inner: &self.inner };
        before_pulse();
        for cb in &callbacks {
            cb();
        }
    }

    fn redeliver_pending(&self, before_pulse: &dyn Fn()) {
        {
            let mut inner = self.inner.borrow_mut();
            if !std::mem::take(&mut inner.pending) {
                return;
            }
            inner.redelivering = true;
        }
        let _redelivery = RedeliveryGuard { inner: &self.inner };
        self.deliver(next_wave(), before_pulse);
    }

    /// Number of delivered fires.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Current notification state.
    #[must_use]
    pub fn state(&self) -> SignalState {
        self.inner.borrow().state
    }

    /// Number of pulses dropped: forwarded waves this signal had already
    /// delivered, and re-entrant fires arriving during a redelivery pass.
    #[must_use]
    pub fn suppressed(&self) -> u64 {
        self.inner.borrow().suppressed
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Whether both handles refer to the same signal.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle to this signal.
    #[must_use]
    pub fn downgrade(&self) -> WeakSignal {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Non-owning reference to a [`ChangeSignal`].
///
/// Used as the back-reference in forwarding callbacks so a child never
/// keeps its parent alive.
#[derive(Clone)]
pub struct WeakSignal {
    inner: Weak<RefCell<SignalInner>>,
}

impl WeakSignal {
    /// Recover the signal if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ChangeSignal> {
        self.inner.upgrade().map(|inner| ChangeSignal { inner })
    }

    /// Whether the referenced signal has been dropped.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Whether this handle points at `signal`.
    #[must_use]
    pub fn points_to(&self, signal: &ChangeSignal) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&signal.inner))
    }
}

impl std::fmt::Debug for WeakSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakSignal")
            .field("alive", &!self.is_dead())
            .finish()
    }
}

/// Anything that exposes a [`ChangeSignal`] other containers can forward.
pub trait ChangeSource {
    /// Handle to the source's change signal.
    fn change_signal(&self) -> ChangeSignal;
}

impl ChangeSource for ChangeSignal {
    fn change_signal(&self) -> ChangeSignal {
        self.clone()
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong `Rc` behind the callback, so
/// the `Weak` held by the signal no longer upgrades and the callback is
/// never invoked again. The dead entry is pruned on the next fire.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Rc` alive.
    _guard: Box<dyn std::any::Any>,
}

impl Subscription {
    /// Explicitly release the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Wrap a strong callback handle created by another observable type.
    pub(crate) fn from_guard(guard: Box<dyn std::any::Any>) -> Self {
        Self { _guard: guard }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

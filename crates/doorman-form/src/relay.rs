//! Observer primitives with synchronous fan-out.
//!
//! `ValueRelay` holds a current value and replays it to new subscribers;
//! `EventRelay` is fire-only. Both notify on the caller's thread, in
//! registration order, after internal locks are released, so observers
//! are free to read back through the relay during a callback.

use std::sync::{Arc, Mutex};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ValueState<T> {
    value: T,
    observers: Vec<Observer<T>>,
}

/// A current-value holder with replay-latest observation.
///
/// Subscribers receive the value once immediately on registration, then
/// again on every subsequent change. Storing a value equal to the current
/// one does not notify. Subscriptions live as long as the relay.
pub struct ValueRelay<T> {
    inner: Mutex<ValueState<T>>,
}

impl<T: Clone + PartialEq> ValueRelay<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(ValueState {
                value: initial,
                observers: Vec::new(),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.lock().unwrap().value.clone()
    }

    /// Register an observer and replay the current value to it.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) {
        let observer: Observer<T> = Arc::new(observer);
        let current = {
            let mut state = self.inner.lock().unwrap();
            state.observers.push(observer.clone());
            state.value.clone()
        };
        observer(&current);
    }

    /// Store a value and notify observers if it changed.
    pub(crate) fn set(&self, value: T) {
        if self.store(value) {
            self.publish();
        }
    }

    /// Store a value without notifying. Returns whether it changed.
    ///
    /// Callers batching several relays update them all with `store`
    /// first, then `publish` each changed relay, so observers never see
    /// a half-updated batch.
    pub(crate) fn store(&self, value: T) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.value == value {
            return false;
        }
        state.value = value;
        true
    }

    /// Notify all observers with the current value.
    pub(crate) fn publish(&self) {
        let (value, observers) = {
            let state = self.inner.lock().unwrap();
            (state.value.clone(), state.observers.clone())
        };
        for observer in observers {
            observer(&value);
        }
    }
}

/// A fire-only event stream: no current value, no replay.
///
/// Used for terminal events (one per attempt) where a late subscriber
/// must not see an old outcome.
pub struct EventRelay<T> {
    observers: Mutex<Vec<Observer<T>>>,
}

impl<T> EventRelay<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer for future events. Nothing is replayed.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) {
        self.observers.lock().unwrap().push(Arc::new(observer));
    }

    /// Deliver an event to every registered observer.
    pub fn publish(&self, event: &T) {
        let observers = self.observers.lock().unwrap().clone();
        for observer in observers {
            observer(event);
        }
    }
}

impl<T> Default for EventRelay<T> {
    fn default() -> Self {
        Self::new()
    }
}

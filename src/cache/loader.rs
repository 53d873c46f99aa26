//! Load Coordinator Module
//!
//! Collapses concurrent loads of the same key into a single loader call.
//! Each cache owns its own coordinator, so keys are only deduplicated within
//! one cache instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

// == Flight State ==
enum FlightState<V> {
    Loading,
    Done(V),
    /// The leading caller unwound before producing a value
    Abandoned,
}

// == Flight ==
/// One in-progress load, shared by every caller waiting on the same key.
struct Flight<V> {
    state: Mutex<FlightState<V>>,
    ready: Condvar,
}

impl<V: Clone> Flight<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Loading),
            ready: Condvar::new(),
        }
    }

    fn finish(&self, state: FlightState<V>) {
        *self.state.lock() = state;
        self.ready.notify_all();
    }

    /// Blocks until the leader finishes. `None` means the leader gave up.
    fn wait(&self) -> Option<V> {
        let mut state = self.state.lock();
        while matches!(*state, FlightState::Loading) {
            self.ready.wait(&mut state);
        }
        match &*state {
            FlightState::Done(value) => Some(value.clone()),
            _ => None,
        }
    }
}

// == Loaded ==
/// How a caller obtained its value from the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<V> {
    /// This caller ran the loader
    Led(V),
    /// Another caller ran the loader and this one received its result
    Shared(V),
}

#[cfg(test)]
impl<V> Loaded<V> {
    pub fn into_value(self) -> V {
        match self {
            Loaded::Led(value) | Loaded::Shared(value) => value,
        }
    }
}

enum Role<V> {
    Leader(Arc<Flight<V>>),
    Follower(Arc<Flight<V>>),
}

// == Load Coordinator ==
/// Per-key single-flight table.
pub struct LoadCoordinator<V> {
    in_flight: Mutex<HashMap<String, Arc<Flight<V>>>>,
}

impl<V: Clone> LoadCoordinator<V> {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    // == Load ==
    /// Runs `load` unless a load for `key` is already running, in which case
    /// the caller blocks and receives that load's result.
    ///
    /// Only callers of the same key wait on each other. If the leading call
    /// panics, the panic propagates to its caller and one of the waiters
    /// takes over as the new leader.
    pub fn load<F>(&self, key: &str, load: F) -> Loaded<V>
    where
        F: FnOnce() -> V,
    {
        let flight = loop {
            match self.join(key) {
                Role::Leader(flight) => break flight,
                Role::Follower(flight) => {
                    if let Some(value) = flight.wait() {
                        return Loaded::Shared(value);
                    }
                }
            }
        };

        let guard = FlightGuard {
            coordinator: self,
            key,
            flight,
            finished: false,
        };
        let value = load();
        guard.complete(value.clone());
        Loaded::Led(value)
    }

    /// Number of keys currently being loaded.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn join(&self, key: &str) -> Role<V> {
        let mut table = self.in_flight.lock();
        if let Some(flight) = table.get(key) {
            return Role::Follower(Arc::clone(flight));
        }
        let flight = Arc::new(Flight::new());
        table.insert(key.to_string(), Arc::clone(&flight));
        Role::Leader(flight)
    }

    fn retire(&self, key: &str, flight: &Arc<Flight<V>>) {
        let mut table = self.in_flight.lock();
        if table.get(key).is_some_and(|current| Arc::ptr_eq(current, flight)) {
            table.remove(key);
        }
    }
}

// == Flight Guard ==
/// Retires the leader's flight on every exit path, waking the waiters.
struct FlightGuard<'a, V: Clone> {
    coordinator: &'a LoadCoordinator<V>,
    key: &'a str,
    flight: Arc<Flight<V>>,
    finished: bool,
}

impl<V: Clone> FlightGuard<'_, V> {
    fn complete(mut self, value: V) {
        self.flight.finish(FlightState::Done(value));
        self.finished = true;
    }
}

impl<V: Clone> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        if !self.finished {
            self.flight.finish(FlightState::Abandoned);
        }
        self.coordinator.retire(self.key, &self.flight);
    }
}

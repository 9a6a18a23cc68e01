//! Blocking single-slot handoff between threads
//!
//! The display worker uses this to pass the server PID (or the reason it
//! could not start one) back to the thread that asked for the display.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct State<T> {
    value: Option<T>,
    available: bool,
    /// Bumped on every send so waiters that were already blocked can tell
    /// a send happened even if another waiter consumed `available` first.
    epoch: u64,
    waiting: usize,
}

impl<T> State<T> {
    fn ready_since(&self, entered: u64) -> bool {
        self.available || self.epoch != entered
    }
}

/// Reusable rendezvous slot guarded by a mutex and condition variable.
///
/// `receive` blocks until `send` has been called, returns the value and clears
/// the availability flag, so the same instance can carry another handoff.
pub struct Handoff<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T: Clone> Handoff<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                value: None,
                available: false,
                epoch: 0,
                waiting: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Store `value` and wake every waiter. Replaces a value nobody has read yet.
    pub fn send(&self, value: T) {
        let mut state = self.lock();
        state.value = Some(value);
        state.available = true;
        state.epoch = state.epoch.wrapping_add(1);
        self.ready.notify_all();
    }

    /// Block until a value is sent, then take it.
    pub fn receive(&self) -> T {
        let mut state = self.lock();
        let entered = state.epoch;
        loop {
            if state.ready_since(entered) {
                if let Some(value) = state.value.clone() {
                    state.available = false;
                    return value;
                }
            }
            state.waiting += 1;
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting -= 1;
        }
    }

    /// Like [`receive`](Self::receive) but gives up after `timeout`.
    pub fn receive_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let entered = state.epoch;
        loop {
            if state.ready_since(entered) {
                if let Some(value) = state.value.clone() {
                    state.available = false;
                    return Some(value);
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state.waiting += 1;
            let (guard, _) = self
                .ready
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.waiting -= 1;
        }
    }

    /// Number of threads currently blocked in a receive.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

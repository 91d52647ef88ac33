//! One-shot rendezvous between a player thread and a waiting caller.

use std::time::Duration as WallDuration;

use parking_lot::{Condvar, Mutex};

/// Holds at most one signal. A later `fire` replaces an unread earlier one, so the
/// waiter sees the last signal recorded before it woke.
#[derive(Debug)]
pub struct Latch<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        Latch {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }
}

impl<T> Latch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self, signal: T) {
        *self.slot.lock() = Some(signal);
        self.ready.notify_all();
    }

    /// Block until a signal arrives and take it.
    pub fn wait(&self) -> T {
        let mut slot = self.slot.lock();
        loop {
            if let Some(signal) = slot.take() {
                return signal;
            }
            self.ready.wait(&mut slot);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: WallDuration) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            self.ready.wait_while_for(&mut slot, |slot| slot.is_none(), timeout);
        }
        slot.take()
    }

    pub fn is_fired(&self) -> bool {
        self.slot.lock().is_some()
    }
}

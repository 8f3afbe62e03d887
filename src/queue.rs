//! A condition-variable-backed FIFO handing session handles from the I/O
//! thread to workers. Deliberately not a channel: `pop` must block until
//! either the queue is non-empty or `shutdown` has been called, and a
//! shut-down queue keeps draining whatever was already pushed before
//! returning `None` forever after — a channel's disconnect semantics don't
//! express that. Grounded on the mutex+condvar+`std::queue` design of a
//! blocking thread-safe queue template.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

/// Unbounded FIFO of session handles. Backpressure is provided by sockets,
/// not by this queue.
pub struct WorkQueue<T> {
    state: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Inner {
                items: VecDeque::new(),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Pushes `item` and wakes exactly one waiter.
    pub fn push(&self, item: T) {
        let mut inner = self.state.lock().unwrap();
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available or the queue has been shut down
    /// and drained, in which case it returns `None`.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.state.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Wakes all waiters; subsequent `pop` calls drain whatever remains
    /// then return `None`.
    pub fn shutdown(&self) {
        let mut inner = self.state.lock().unwrap();
        inner.shutdown = true;
        drop(inner);
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

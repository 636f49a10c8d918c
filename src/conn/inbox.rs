//! Ordered hand-off buffer from the receive loop to the owner thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Thread-safe FIFO of decoded chat-message bodies.
///
/// Single producer (the receive loop) and single consumer (the owner
/// thread); insertion order equals wire order, and `poll` yields in the same
/// order. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message body. Called from the receive loop.
    pub fn push(&self, body: String) {
        self.lock().push_back(body);
    }

    /// Remove and return the oldest message, or `None` when empty.
    pub fn poll(&self) -> Option<String> {
        self.lock().pop_front()
    }

    /// Whether any messages are waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // A panic while holding this lock means a poisoned queue is the least
        // of our problems; recover the guard and keep going.
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// src/queue.rs - Fixed-capacity blocking FIFO between pipeline threads
use crate::error::{PipelineError, Result};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Capacity used by every pipeline queue unless configured otherwise. Large
/// enough that a blocking `enqueue` is a safety valve, not a throttle.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

struct QueueState<T> {
    items: VecDeque<T>,
    released: bool,
}

/// Bounded FIFO with blocking backpressure on both ends.
///
/// `release` wakes every waiter once and for all: consumers drain whatever is
/// still queued and then get `None`, producers get
/// [`PipelineError::QueueReleased`].
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(1024)),
                released: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // A panicking holder cannot leave the deque half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a slot is free, appends, and wakes one consumer.
    pub fn enqueue(&self, item: T) -> Result<()> {
        let mut state = self.lock();
        while state.items.len() >= self.capacity && !state.released {
            state = self.not_full.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.released {
            return Err(PipelineError::QueueReleased);
        }

        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until an item is available and returns the oldest one.
    /// Returns `None` once the queue is released and fully drained.
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.released {
                return None;
            }
            state = self.not_empty.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Momentary count; stale as soon as it is returned.
    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn release(&self) {
        self.lock().released = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

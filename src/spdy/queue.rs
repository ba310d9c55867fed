use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The connection's shared output channel: every stream pushes serialized
/// frames in, one writer thread drains them. Entries leave in ascending
/// (priority, sequence) order, so lower priorities always win and pushes
/// within one priority tier pop strictly first-in first-out.
pub struct FramePriorityQueue {
    inner: Mutex<Inner>,
    available: Condvar,
}

struct Inner {
    frames: BTreeMap<(i32, u64), Vec<u8>>,
    next_sequence: u64,
}

impl Inner {
    fn take_first(&mut self) -> Option<Vec<u8>> {
        let key = *self.frames.keys().next()?;

        self.frames.remove(&key)
    }
}

impl FramePriorityQueue {
    /// Outranks every stream priority; reserved for control frames.
    pub const TOP_PRIORITY: i32 = -1;

    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: BTreeMap::new(),
                next_sequence: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Never blocks. Each push makes one blocked pop eligible to proceed.
    pub fn push(&self, priority: i32, frame: Vec<u8>) {
        let mut inner = self.lock();
        let key = (priority, inner.next_sequence);
        inner.next_sequence += 1;
        inner.frames.insert(key, frame);
        drop(inner);
        self.available.notify_one();
    }

    pub fn pop(&self) -> Option<Vec<u8>> {
        self.lock().take_first()
    }

    /// Removes and returns the frontmost frame, waiting up to `timeout` for
    /// one to arrive. `None` means nothing was available in time, not an
    /// error; callers should try again.
    pub fn blocking_pop(&self, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if let Some(frame) = inner.take_first() {
                return Some(frame);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .available
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            inner = guard;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FramePriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

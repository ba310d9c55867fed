use super::codec::FrameCodec;
use super::frames::{Frame, StatusCode};
use super::queue::FramePriorityQueue;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub(crate) const POP_TIMEOUT: Duration = Duration::from_millis(100);

/// One-shot latch a worker thread sets when its task completes, so tests can
/// assert whether a send call is still blocked.
pub(crate) struct Notification {
    set: Mutex<bool>,
    changed: Condvar,
}

impl Notification {
    pub fn new() -> Self {
        Self {
            set: Mutex::new(false),
            changed: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        *set = true;
        self.changed.notify_all();
    }

    pub fn has_been_set(&self) -> bool {
        *self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn expect_not_set(&self) {
        assert!(!self.has_been_set(), "notification was set prematurely");
    }

    pub fn expect_set_within(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while !*set {
            let now = Instant::now();
            assert!(now < deadline, "notification was not set within {timeout:?}");
            let (guard, _) = self
                .changed
                .wait_timeout(set, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            set = guard;
        }
    }
}

fn pop_and_parse(queue: &FramePriorityQueue, codec: &dyn FrameCodec) -> Frame {
    let bytes = queue
        .blocking_pop(POP_TIMEOUT)
        .expect("expected a frame on the output queue");

    codec.parse(&bytes).expect("could not parse queued frame")
}

pub(crate) fn expect_data_frame(
    queue: &FramePriorityQueue,
    codec: &dyn FrameCodec,
    payload: &[u8],
    fin: bool,
) {
    match pop_and_parse(queue, codec) {
        Frame::Data {
            payload: queued,
            fin: queued_fin,
            ..
        } => {
            assert_eq!(queued.as_ref(), payload);
            assert_eq!(queued_fin, fin, "unexpected FLAG_FIN");
        }
        frame => panic!("expected a data frame, popped {frame}"),
    }
}

pub(crate) fn expect_rst_stream(
    queue: &FramePriorityQueue,
    codec: &dyn FrameCodec,
    status: StatusCode,
) {
    match pop_and_parse(queue, codec) {
        Frame::RstStream {
            status: queued, ..
        } => assert_eq!(queued, status),
        frame => panic!("expected a rst_stream frame, popped {frame}"),
    }
}

pub(crate) fn expect_window_update(
    queue: &FramePriorityQueue,
    codec: &dyn FrameCodec,
    delta: u32,
) {
    match pop_and_parse(queue, codec) {
        Frame::WindowUpdate { delta: queued, .. } => assert_eq!(queued, delta),
        frame => panic!("expected a window_update frame, popped {frame}"),
    }
}

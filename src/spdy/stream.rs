use super::codec::FrameCodec;
use super::frames::{Frame, HeaderBlock, StatusCode, StreamId};
use super::queue::FramePriorityQueue;
use super::MAX_WINDOW_SIZE;
use bytes::Bytes;
use log::{debug, trace};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Window size granted to a new stream before the peer says otherwise.
pub const DEFAULT_INITIAL_WINDOW_SIZE: i32 = 64 * 1024;

/// One multiplexed stream's sending half: owns the flow-control window and
/// abort flag, chunks outgoing data against the window, and feeds serialized
/// frames into the connection's shared output queue.
///
/// All operations take `&self`; the producer thread driving sends and the
/// threads delivering control updates may call in concurrently. The stream
/// borrows its queue and codec and must not outlive either.
pub struct Stream<'a> {
    id: StreamId,
    associated_id: StreamId,
    priority: u8,
    has_flow_control: bool,
    window: Mutex<Window>,
    window_changed: Condvar,
    output_queue: &'a FramePriorityQueue,
    codec: &'a dyn FrameCodec,
}

struct Window {
    // May legally go negative: a settings reduction can arrive after data
    // was already sent against the larger window.
    size: i32,
    aborted: bool,
}

impl<'a> Stream<'a> {
    pub fn new(
        id: StreamId,
        associated_id: StreamId,
        priority: u8,
        initial_window_size: i32,
        output_queue: &'a FramePriorityQueue,
        codec: &'a dyn FrameCodec,
    ) -> Self {
        Self {
            id,
            associated_id,
            priority,
            has_flow_control: codec.version().has_flow_control(),
            window: Mutex::new(Window {
                size: initial_window_size,
                aborted: false,
            }),
            window_changed: Condvar::new(),
            output_queue,
            codec,
        }
    }

    /// Sends `data` on this stream, splitting it into DATA frames no larger
    /// than the current window and blocking whenever the window is spent.
    /// Returns once everything is queued or the stream is aborted; an abort
    /// observed mid-send discards the rest of the data silently.
    pub fn send_output_data_frame(&self, data: &[u8], fin: bool) {
        if !self.has_flow_control {
            let window = self.lock_window();
            if window.aborted {
                return;
            }
            self.enqueue_locked(
                i32::from(self.priority),
                Frame::Data {
                    stream_id: self.id,
                    payload: Bytes::copy_from_slice(data),
                    fin,
                },
            );
            return;
        }

        if data.is_empty() {
            // A bare FIN still has to reach the peer; it costs no window.
            let window = self.lock_window();
            if window.aborted || !fin {
                return;
            }
            self.enqueue_locked(
                i32::from(self.priority),
                Frame::Data {
                    stream_id: self.id,
                    payload: Bytes::new(),
                    fin: true,
                },
            );
            return;
        }

        let mut offset = 0;
        while offset < data.len() {
            let mut window = self.lock_window();
            while !window.aborted && window.size <= 0 {
                trace!("stream {}: window spent, waiting", self.id);
                window = self.wait_window(window);
            }
            if window.aborted {
                debug!("stream {}: send abandoned after abort", self.id);
                return;
            }
            let chunk = (data.len() - offset).min(window.size as usize);
            window.size -= chunk as i32;
            let end = offset + chunk;
            self.enqueue_locked(
                i32::from(self.priority),
                Frame::Data {
                    stream_id: self.id,
                    payload: Bytes::copy_from_slice(&data[offset..end]),
                    fin: fin && end == data.len(),
                },
            );
            drop(window);
            offset = end;
        }
    }

    /// Headers are not flow controlled; this never blocks.
    pub fn send_output_headers(&self, headers: HeaderBlock, fin: bool) {
        let window = self.lock_window();
        if window.aborted {
            return;
        }
        self.enqueue_locked(
            i32::from(self.priority),
            Frame::Headers {
                stream_id: self.id,
                headers,
                fin,
            },
        );
    }

    /// Grants the peer `delta` more bytes of receive budget on this stream.
    pub fn send_output_window_update(&self, delta: u32) {
        if !self.has_flow_control {
            return;
        }
        let window = self.lock_window();
        if window.aborted {
            return;
        }
        self.enqueue_locked(
            FramePriorityQueue::TOP_PRIORITY,
            Frame::WindowUpdate {
                stream_id: self.id,
                delta,
            },
        );
    }

    /// Applies a WINDOW_UPDATE delta (or a settings-change correction, which
    /// may be negative) to the send window. Growing the window past the
    /// 31-bit maximum is a peer protocol violation: the update is discarded
    /// and the stream aborts with FLOW_CONTROL_ERROR.
    pub fn adjust_window_size(&self, delta: i32) {
        let mut window = self.lock_window();
        if window.aborted {
            return;
        }
        let new_size = i64::from(window.size) + i64::from(delta);
        if new_size > i64::from(MAX_WINDOW_SIZE) {
            debug!(
                "stream {}: window adjustment {delta:+} on {} overflows",
                self.id, window.size
            );
            drop(window);
            self.abort_with_rst_stream(StatusCode::FlowControlError);
            return;
        }
        window.size = new_size as i32;
        trace!("stream {}: window {delta:+} -> {}", self.id, window.size);
        if window.size > 0 {
            self.window_changed.notify_all();
        }
    }

    /// Terminates the stream: emits one RST_STREAM frame carrying `status`
    /// and releases every thread blocked in `send_output_data_frame`.
    /// Aborting twice is a no-op; a second RST_STREAM is never queued.
    pub fn abort_with_rst_stream(&self, status: StatusCode) {
        let mut window = self.lock_window();
        if window.aborted {
            return;
        }
        window.aborted = true;
        debug!("stream {}: aborted with {status:?}", self.id);
        self.enqueue_locked(
            FramePriorityQueue::TOP_PRIORITY,
            Frame::RstStream {
                stream_id: self.id,
                status,
            },
        );
        self.window_changed.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.lock_window().aborted
    }

    pub fn current_window_size(&self) -> i32 {
        self.lock_window().size
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn associated_id(&self) -> StreamId {
        self.associated_id
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_server_push(&self) -> bool {
        self.associated_id != 0
    }

    // Callers hold the window lock, making the abort check and the push one
    // atomic step: nothing is queued after `aborted` flips. The queue lock
    // nests inside the stream lock and never the other way around.
    fn enqueue_locked(&self, priority: i32, frame: Frame) {
        trace!("stream {}: queueing {frame}", self.id);
        self.output_queue.push(priority, self.codec.serialize(&frame));
    }

    fn lock_window(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_window<'g>(&self, guard: MutexGuard<'g, Window>) -> MutexGuard<'g, Window> {
        self.window_changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

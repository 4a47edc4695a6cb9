//! Per-stream state: producer, sent/confirmed counters, liveness and chunk window.

use std::fmt;
use std::time::Instant;

use crate::producer::BodyProducer;

use super::window::ChunkWindow;

pub struct Job {
    producer: Box<dyn BodyProducer>,
    bytes_sent: u64,
    bytes_confirmed: u64,
    bytes_confirmed_prev_tick: u64,
    alive: bool,
    window: ChunkWindow,
    chunks_sent: u64,
    started_at: Instant,
}

impl Job {
    /// New job whose first frame (`first_frame_len` bytes) has already been sent.
    pub fn new(producer: Box<dyn BodyProducer>, first_frame_len: u64) -> Self {
        let mut window = ChunkWindow::new();
        window.push(first_frame_len);
        Self {
            producer,
            bytes_sent: first_frame_len,
            bytes_confirmed: 0,
            bytes_confirmed_prev_tick: 0,
            alive: true,
            window,
            chunks_sent: 1,
            started_at: Instant::now(),
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_confirmed(&self) -> u64 {
        self.bytes_confirmed
    }

    pub fn bytes_confirmed_prev_tick(&self) -> u64 {
        self.bytes_confirmed_prev_tick
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn window(&self) -> &ChunkWindow {
        &self.window
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Bytes handed to the server and not yet reported flushed.
    pub fn outstanding(&self) -> u64 {
        self.bytes_sent - self.bytes_confirmed
    }

    /// Bytes the server flushed since the previous reconciliation.
    pub fn delivered_this_tick(&self) -> u64 {
        self.bytes_confirmed
            .saturating_sub(self.bytes_confirmed_prev_tick)
    }

    /// The server has flushed everything sent so far.
    pub fn is_drained(&self) -> bool {
        self.bytes_sent == self.bytes_confirmed
    }

    /// Start of a reconciliation: assume gone until the report lists us.
    pub(crate) fn begin_reconcile(&mut self) {
        self.alive = false;
        self.bytes_confirmed_prev_tick = self.bytes_confirmed;
    }

    /// Applies a reported flushed-byte counter and marks the job alive.
    ///
    /// The counter never decreases and never exceeds `bytes_sent`.
    pub(crate) fn confirm(&mut self, reported: i64) {
        let reported = u64::try_from(reported).unwrap_or(0);
        if reported > self.bytes_sent {
            tracing::debug!(
                reported,
                bytes_sent = self.bytes_sent,
                "server reported more bytes than sent; clamping"
            );
        }
        self.bytes_confirmed = reported.min(self.bytes_sent).max(self.bytes_confirmed);
        self.alive = true;
    }

    /// Accounts for an admitted chunk of `size` bytes.
    pub(crate) fn record_sent(&mut self, size: u64) {
        self.bytes_sent += size;
        self.window.push(size);
        self.chunks_sent += 1;
    }

    pub(crate) fn producer_mut(&mut self) -> &mut dyn BodyProducer {
        self.producer.as_mut()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_confirmed", &self.bytes_confirmed)
            .field("bytes_confirmed_prev_tick", &self.bytes_confirmed_prev_tick)
            .field("alive", &self.alive)
            .field("chunks_sent", &self.chunks_sent)
            .finish_non_exhaustive()
    }
}

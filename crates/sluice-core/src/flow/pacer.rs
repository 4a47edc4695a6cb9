//! Admission: how many more chunks each stream may push this tick.
//!
//! Two budgets bound the bytes in flight (`bytes_sent - bytes_confirmed`):
//!
//! * throughput: `max(delivered last tick, min_target_bytes)`, doubled when the
//!   server had drained everything, so the buffer tracks what the client
//!   actually consumes;
//! * chunk slots: the window sum minus its oldest entry, so the number of
//!   unflushed frames stays under the server's per-connection frame limit.
//!
//! Both are checked before each admission; a chunk is admitted when neither is
//! exceeded at that point.

use std::io;
use std::time::{Duration, Instant};

use crate::config::{PacingConfig, DEFAULT_MIN_TARGET_BYTES};
use crate::downstream::Downstream;
use crate::error::SluiceError;

use super::job::Job;
use super::table::JobTable;
use super::StreamId;

/// Consecutive empty chunks tolerated in one pass before the producer is
/// treated as stuck.
pub const MAX_EMPTY_CHUNKS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerSettings {
    /// Floor for the throughput budget.
    pub min_target_bytes: u64,
    /// A single producer call slower than this fails the job.
    pub producer_deadline: Option<Duration>,
}

impl Default for PacerSettings {
    fn default() -> Self {
        Self {
            min_target_bytes: DEFAULT_MIN_TARGET_BYTES,
            producer_deadline: None,
        }
    }
}

impl From<&PacingConfig> for PacerSettings {
    fn from(cfg: &PacingConfig) -> Self {
        Self {
            min_target_bytes: cfg.min_target_bytes,
            producer_deadline: cfg.producer_deadline_ms.map(Duration::from_millis),
        }
    }
}

/// Why pacing stopped for a job that stays in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceStop {
    /// Enough bytes in flight for the observed throughput.
    Throughput,
    /// No chunk slot left on the server.
    SlotLimit,
}

#[derive(Debug)]
pub enum PaceOutcome {
    /// Job stays; `admitted` chunks were pushed this tick.
    Paused { admitted: usize, stop: PaceStop },
    /// Producer exhausted; the end-of-stream frame was sent.
    Finished { admitted: usize },
    /// Producer or transport failed; a best-effort end-of-stream frame was sent.
    Failed { admitted: usize, error: SluiceError },
}

impl PaceOutcome {
    pub fn admitted(&self) -> usize {
        match self {
            PaceOutcome::Paused { admitted, .. }
            | PaceOutcome::Finished { admitted }
            | PaceOutcome::Failed { admitted, .. } => *admitted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaceOutcome::Paused { .. })
    }
}

/// Totals for one pass over a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaceSummary {
    pub admitted_chunks: usize,
    pub finished: Vec<StreamId>,
    pub failed: Vec<StreamId>,
}

/// Throughput budget target for this tick.
pub fn target_size(job: &Job, settings: &PacerSettings) -> u64 {
    job.delivered_this_tick().max(settings.min_target_bytes)
}

/// 2 when the server has drained everything we sent, 1 otherwise.
pub fn overcommit(job: &Job) -> u64 {
    if job.is_drained() {
        2
    } else {
        1
    }
}

/// Runs the admission loop for one job.
pub fn pace_job(
    job: &mut Job,
    stream: StreamId,
    downstream: &mut dyn Downstream,
    tag: &str,
    settings: &PacerSettings,
) -> PaceOutcome {
    let budget = target_size(job, settings).saturating_mul(overcommit(job));
    let mut admitted = 0;
    let mut empty_run = 0;

    loop {
        let outstanding = job.outstanding();
        if outstanding > budget {
            return PaceOutcome::Paused {
                admitted,
                stop: PaceStop::Throughput,
            };
        }
        if outstanding > job.window().slot_budget() {
            return PaceOutcome::Paused {
                admitted,
                stop: PaceStop::SlotLimit,
            };
        }

        let deadline = settings.producer_deadline;
        let has_more = match timed(deadline, || job.producer_mut().has_more()) {
            Ok(more) => more,
            Err(e) => return fail(downstream, tag, stream, admitted, SluiceError::producer(stream, e)),
        };
        if !has_more {
            if let Err(e) = downstream.send(tag, stream, &[]) {
                tracing::warn!(stream_id = %stream, "end-of-stream frame not sent: {}", e);
            }
            return PaceOutcome::Finished { admitted };
        }

        let chunk = match timed(deadline, || job.producer_mut().take_next()) {
            Ok(chunk) => chunk,
            Err(e) => return fail(downstream, tag, stream, admitted, SluiceError::producer(stream, e)),
        };
        // An empty payload means end-of-stream to the server.
        if chunk.is_empty() {
            empty_run += 1;
            if empty_run >= MAX_EMPTY_CHUNKS {
                let err = SluiceError::producer(stream, "producer keeps yielding empty chunks");
                return fail(downstream, tag, stream, admitted, err);
            }
            continue;
        }
        empty_run = 0;

        job.record_sent(chunk.len() as u64);
        if let Err(e) = downstream.send(tag, stream, &chunk) {
            return fail(downstream, tag, stream, admitted, SluiceError::Transport(e));
        }
        admitted += 1;
        tracing::trace!(
            stream_id = %stream,
            bytes = chunk.len(),
            outstanding = job.outstanding(),
            "chunk admitted"
        );
    }
}

/// Paces every job in the table, removing finished and failed ones.
/// A failing job never stops the pass for the others.
pub fn pace_table(
    table: &mut JobTable,
    downstream: &mut dyn Downstream,
    tag: &str,
    settings: &PacerSettings,
) -> PaceSummary {
    let mut summary = PaceSummary::default();
    for stream in table.stream_ids() {
        let Some(job) = table.get_mut(stream) else {
            continue;
        };
        let outcome = pace_job(job, stream, downstream, tag, settings);
        summary.admitted_chunks += outcome.admitted();
        match outcome {
            PaceOutcome::Paused { .. } => {}
            PaceOutcome::Finished { .. } => {
                if let Some(job) = table.remove(stream) {
                    tracing::info!(
                        stream_id = %stream,
                        bytes_sent = job.bytes_sent(),
                        chunks = job.chunks_sent(),
                        elapsed_ms = job.started_at().elapsed().as_millis() as u64,
                        "download finished"
                    );
                }
                summary.finished.push(stream);
            }
            PaceOutcome::Failed { error, .. } => {
                table.remove(stream);
                tracing::warn!(stream_id = %stream, "download aborted: {}", error);
                summary.failed.push(stream);
            }
        }
    }
    summary
}

fn fail(
    downstream: &mut dyn Downstream,
    tag: &str,
    stream: StreamId,
    admitted: usize,
    error: SluiceError,
) -> PaceOutcome {
    if let Err(e) = downstream.send(tag, stream, &[]) {
        tracing::warn!(stream_id = %stream, "end-of-stream frame not sent: {}", e);
    }
    PaceOutcome::Failed { admitted, error }
}

/// Runs a producer call; a call that outlives `deadline` counts as a failure.
fn timed<T>(deadline: Option<Duration>, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
    let start = Instant::now();
    let out = f()?;
    if let Some(limit) = deadline {
        let took = start.elapsed();
        if took > limit {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("producer call took {:?} (deadline {:?})", took, limit),
            ));
        }
    }
    Ok(out)
}

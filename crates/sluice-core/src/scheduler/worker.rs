//! One thread per delivery server connection.
//!
//! The worker exclusively owns its transport and its [`JobTable`]; intake
//! commands and control ticks both run on this thread, so a job is never
//! created and paced at the same time. Between ticks it blocks on its command
//! channel, waking up when the next tick slot opens.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use crate::downstream::Downstream;
use crate::error::SluiceError;
use crate::flow::feedback::{self, Reconciliation};
use crate::flow::intake::start_download;
use crate::flow::pacer::{pace_table, PaceSummary, PacerSettings};
use crate::flow::{JobTable, StreamId};
use crate::producer::BodyProducer;

use super::tick::TickScheduler;

/// A download command whose body already resolved to a producer.
pub struct PreparedDownload {
    pub stream: StreamId,
    pub headers: Vec<u8>,
    pub producer: Box<dyn BodyProducer>,
}

pub enum WorkerCommand {
    Download {
        request: PreparedDownload,
        reply: oneshot::Sender<Result<u64, SluiceError>>,
    },
    Shutdown,
}

/// What one control tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// None when the status query got no usable reply and the tick was skipped.
    pub reconciliation: Option<Reconciliation>,
    pub pacing: PaceSummary,
}

pub struct ConnectionWorker {
    downstream: Box<dyn Downstream>,
    table: JobTable,
    tag: String,
    pacer: PacerSettings,
    ticks: TickScheduler,
}

impl ConnectionWorker {
    pub fn new(
        downstream: Box<dyn Downstream>,
        tag: impl Into<String>,
        pacer: PacerSettings,
        ticks: TickScheduler,
    ) -> Self {
        Self {
            downstream,
            table: JobTable::new(),
            tag: tag.into(),
            pacer,
            ticks,
        }
    }

    pub fn address(&self) -> &str {
        self.downstream.address()
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    pub fn create_download(&mut self, request: PreparedDownload) -> Result<u64, SluiceError> {
        start_download(
            &mut self.table,
            self.downstream.as_mut(),
            &self.tag,
            request.stream,
            &request.headers,
            request.producer,
        )
    }

    /// Reconciles feedback, then paces every remaining job.
    pub fn tick(&mut self) -> TickReport {
        if self.table.is_empty() {
            return TickReport::default();
        }
        let reconciliation = match feedback::poll(&mut self.table, self.downstream.as_mut()) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(address = self.downstream.address(), "skipping tick: {}", e);
                return TickReport::default();
            }
        };
        let pacing = pace_table(
            &mut self.table,
            self.downstream.as_mut(),
            &self.tag,
            &self.pacer,
        );
        if pacing.admitted_chunks > 0 || !reconciliation.reaped.is_empty() {
            tracing::debug!(
                address = self.downstream.address(),
                jobs = self.table.len(),
                admitted = pacing.admitted_chunks,
                reaped = reconciliation.reaped.len(),
                "tick"
            );
        }
        TickReport {
            reconciliation: Some(reconciliation),
            pacing,
        }
    }

    /// Serves commands and ticks until `Shutdown` or all senders are dropped.
    pub fn run(mut self, commands: mpsc::Receiver<WorkerCommand>) {
        tracing::info!(address = self.address(), "connection worker started");
        loop {
            match commands.recv_timeout(self.ticks.until_next_tick()) {
                Ok(WorkerCommand::Download { request, reply }) => {
                    let stream = request.stream;
                    let result = self.create_download(request);
                    if let Err(e) = &result {
                        tracing::warn!(stream_id = %stream, "download rejected: {}", e);
                    }
                    let _ = reply.send(result);
                }
                Ok(WorkerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.ticks.try_begin_tick() {
                self.tick();
            }
        }
        tracing::info!(
            address = self.address(),
            abandoned_jobs = self.table.len(),
            "connection worker stopped"
        );
    }

    /// Moves the worker onto its own thread.
    pub fn spawn(self) -> io::Result<WorkerHandle> {
        let address = self.address().to_string();
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(format!("sluice-worker {}", address))
            .spawn(move || self.run(rx))?;
        Ok(WorkerHandle {
            address,
            tx,
            thread: Mutex::new(Some(thread)),
        })
    }
}

/// Handle to a running [`ConnectionWorker`].
pub struct WorkerHandle {
    address: String,
    tx: mpsc::Sender<WorkerCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hands a download to the worker and waits for the first-frame result.
    pub async fn download(&self, request: PreparedDownload) -> Result<u64, SluiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerCommand::Download { request, reply })
            .map_err(|_| self.gone())?;
        rx.await.map_err(|_| self.gone())?
    }

    /// Stops the worker and waits for its thread. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!(address = %self.address, "connection worker panicked");
            }
        }
    }

    fn gone(&self) -> SluiceError {
        SluiceError::WorkerGone {
            address: self.address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::ChunkProducer;
    use crate::scheduler::tick::ManualClock;
    use crate::status::NetStatusRow;
    use crate::testing::RecordingDownstream;
    use std::sync::Arc;
    use std::time::Duration;

    fn worker(ds: RecordingDownstream) -> ConnectionWorker {
        let ticks = TickScheduler::new(Arc::new(ManualClock::new()), Duration::from_millis(1000));
        ConnectionWorker::new(Box::new(ds), "tag", PacerSettings::default(), ticks)
    }

    fn request(id: u64, chunks: Vec<&str>) -> PreparedDownload {
        PreparedDownload {
            stream: StreamId(id),
            headers: b"H".to_vec(),
            producer: Box::new(ChunkProducer::new(chunks)),
        }
    }

    #[test]
    fn tick_without_jobs_does_not_query() {
        let mut w = worker(RecordingDownstream::new("tcp://a"));
        let report = w.tick();
        assert!(report.reconciliation.is_none());
    }

    #[test]
    fn unavailable_control_channel_skips_pacing() {
        let mut ds = RecordingDownstream::new("tcp://a");
        ds.set_unavailable();
        let mut w = worker(ds);
        assert_eq!(w.create_download(request(1, vec!["a", "b"])).unwrap(), 2);
        let report = w.tick();
        assert!(report.reconciliation.is_none());
        assert_eq!(report.pacing.admitted_chunks, 0);
        assert!(w.table().contains(StreamId(1)));
    }

    #[test]
    fn listed_job_is_paced_to_completion() {
        let mut ds = RecordingDownstream::new("tcp://a");
        ds.set_rows(vec![NetStatusRow::connection(1, 0)]);
        let mut w = worker(ds);
        w.create_download(request(1, vec!["a", "b", "c"])).unwrap();
        let report = w.tick();
        assert_eq!(report.reconciliation.unwrap().confirmed, 1);
        assert_eq!(report.pacing.admitted_chunks, 2);
        assert_eq!(report.pacing.finished, vec![StreamId(1)]);
        assert!(w.table().is_empty());
    }

    #[test]
    fn unlisted_job_is_reaped_without_sending() {
        let mut w = worker(RecordingDownstream::new("tcp://a"));
        w.create_download(request(4, vec!["a", "b"])).unwrap();
        let report = w.tick();
        assert_eq!(report.reconciliation.unwrap().reaped, vec![StreamId(4)]);
        assert_eq!(report.pacing.admitted_chunks, 0);
        assert!(w.table().is_empty());
    }

    #[tokio::test]
    async fn spawned_worker_acks_and_shuts_down() {
        let handle = worker(RecordingDownstream::new("tcp://a")).spawn().unwrap();
        assert_eq!(handle.address(), "tcp://a");
        let size = handle.download(request(2, vec!["body"])).await.unwrap();
        assert_eq!(size, 5);
        handle.shutdown();
        handle.shutdown();
        let err = handle.download(request(3, vec!["x"])).await.unwrap_err();
        assert!(matches!(err, SluiceError::WorkerGone { .. }));
    }
}

//! Routes download commands to the worker owning the requested delivery server.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SluiceConfig;
use crate::control::{parse_command, Ack, Command, DownloadCommand};
use crate::downstream::Downstream;
use crate::error::SluiceError;
use crate::flow::pacer::PacerSettings;

use super::tick::{Clock, SystemClock, TickScheduler};
use super::worker::{ConnectionWorker, PreparedDownload, WorkerHandle};

pub struct Dispatcher {
    workers: BTreeMap<String, WorkerHandle>,
}

impl Dispatcher {
    /// Starts one worker per downstream, ticking on the system clock.
    pub fn from_downstreams(
        downstreams: Vec<Box<dyn Downstream>>,
        cfg: &SluiceConfig,
    ) -> Result<Self, SluiceError> {
        Self::with_clock(downstreams, cfg, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        downstreams: Vec<Box<dyn Downstream>>,
        cfg: &SluiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SluiceError> {
        if downstreams.is_empty() {
            return Err(SluiceError::ConfigurationMissing);
        }
        let pacer = PacerSettings::from(&cfg.pacing());
        let mut workers = BTreeMap::new();
        for downstream in downstreams {
            let address = downstream.address().to_string();
            if workers.contains_key(&address) {
                tracing::warn!(address = %address, "duplicate delivery server ignored");
                continue;
            }
            let ticks = TickScheduler::new(Arc::clone(&clock), cfg.tick_interval());
            let worker = ConnectionWorker::new(downstream, cfg.sender_id.clone(), pacer, ticks);
            workers.insert(address, worker.spawn()?);
        }
        Ok(Self { workers })
    }

    pub fn addresses(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    /// Parses one command line and answers it.
    pub async fn handle_line(&self, line: &str) -> Ack {
        match parse_command(line) {
            Ok(command) => self.handle(command).await,
            Err(e) => Ack::error(format!("invalid command: {}", e)),
        }
    }

    pub async fn handle(&self, command: Command) -> Ack {
        match command {
            Command::Download(cmd) => {
                let stream = cmd.id;
                match self.create_download(cmd).await {
                    Ok(_) => Ack::ok(),
                    Err(e) => {
                        tracing::warn!(stream_id = %stream, "download command failed: {}", e);
                        Ack::error(e.to_string())
                    }
                }
            }
            Command::Unknown => Ack::unknown_action(),
        }
    }

    /// Validates the body, resolves the worker and waits for the first frame.
    /// Returns the first frame size.
    pub async fn create_download(&self, cmd: DownloadCommand) -> Result<u64, SluiceError> {
        let DownloadCommand {
            id,
            downstream_address,
            response_payload,
        } = cmd;
        if !response_payload.body.is_iterable() {
            return Err(SluiceError::NotIterable);
        }
        let worker = self
            .workers
            .get(&downstream_address)
            .ok_or(SluiceError::UnknownDownstream {
                address: downstream_address,
            })?;
        let producer = response_payload.body.into_producer(id)?;
        worker
            .download(PreparedDownload {
                stream: id,
                headers: response_payload.headers.into_bytes(),
                producer,
            })
            .await
    }

    /// Stops every worker; jobs still in flight are dropped.
    pub fn shutdown(&self) {
        for worker in self.workers.values() {
            worker.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::StreamId;
    use crate::response::{BodySpec, ResponsePayload};
    use crate::scheduler::tick::ManualClock;
    use crate::testing::RecordingDownstream;

    fn dispatcher(addrs: &[&str]) -> Dispatcher {
        let downstreams: Vec<Box<dyn Downstream>> = addrs
            .iter()
            .map(|a| Box::new(RecordingDownstream::new(a)) as Box<dyn Downstream>)
            .collect();
        Dispatcher::with_clock(downstreams, &SluiceConfig::default(), Arc::new(ManualClock::new()))
            .unwrap()
    }

    fn download(address: &str, body: BodySpec) -> DownloadCommand {
        DownloadCommand {
            id: StreamId(1),
            downstream_address: address.to_string(),
            response_payload: ResponsePayload {
                headers: "HTTP/1.1 200 OK\r\n\r\n".to_string(),
                body,
            },
        }
    }

    #[test]
    fn no_downstreams_is_configuration_missing() {
        let err = Dispatcher::from_downstreams(Vec::new(), &SluiceConfig::default()).err().unwrap();
        assert!(matches!(err, SluiceError::ConfigurationMissing));
    }

    #[tokio::test]
    async fn duplicate_addresses_get_one_worker() {
        let d = dispatcher(&["tcp://b", "tcp://a", "tcp://b"]);
        assert_eq!(d.addresses(), vec!["tcp://a", "tcp://b"]);
        d.shutdown();
    }

    #[tokio::test]
    async fn not_iterable_is_checked_before_routing() {
        let d = dispatcher(&["tcp://a"]);
        let body = BodySpec::Opaque(serde_json::json!("plain"));
        let err = d.create_download(download("tcp://nowhere", body)).await.unwrap_err();
        assert!(matches!(err, SluiceError::NotIterable));
        d.shutdown();
    }

    #[tokio::test]
    async fn unknown_downstream_is_rejected() {
        let d = dispatcher(&["tcp://a"]);
        let ack = d
            .handle(Command::Download(download("tcp://b", BodySpec::Chunks(vec!["x".into()]))))
            .await;
        assert!(!ack.ok);
        assert!(ack.msg.unwrap().contains("tcp://b"));
        d.shutdown();
    }

    #[tokio::test]
    async fn download_is_acked_with_first_frame() {
        let d = dispatcher(&["tcp://a"]);
        let size = d
            .create_download(download("tcp://a", BodySpec::Chunks(vec!["abc".into()])))
            .await
            .unwrap();
        assert_eq!(size, 19 + 3);
        d.shutdown();
    }

    #[tokio::test]
    async fn lines_and_unknown_actions() {
        let d = dispatcher(&["tcp://a"]);
        assert_eq!(d.handle_line(r#"{"action":"pause"}"#).await, Ack::unknown_action());
        let ack = d.handle_line("{").await;
        assert!(!ack.ok);
        assert!(ack.msg.unwrap().starts_with("invalid command"));
        d.shutdown();
    }
}

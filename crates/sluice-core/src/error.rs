//! Error kinds surfaced by intake, feedback polling and pacing.

use thiserror::Error;

use crate::flow::StreamId;

/// Errors the core reports to callers (intake acks) or handles per tick.
///
/// Only `ConfigurationMissing` is fatal, and only at startup. Everything else
/// is isolated to one command, one tick or one job.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// The response body is not producer-shaped (e.g. a plain string).
    #[error("the content of the response is not iterable")]
    NotIterable,

    /// No connection worker is registered for the requested address.
    #[error("download worker does not know the delivery server {address}")]
    UnknownDownstream { address: String },

    /// Status query timed out or the control socket is down.
    #[error("control channel unavailable for {address}")]
    ControlChannelUnavailable { address: String },

    /// The body source failed (or stalled past its deadline) while being advanced.
    #[error("body producer failed for stream {stream}: {reason}")]
    ProducerFailure { stream: StreamId, reason: String },

    /// No usable delivery server in the configuration.
    #[error("no delivery servers with both pub_addr and ctrl_addr configured")]
    ConfigurationMissing,

    /// Undecodable control reply.
    #[error("protocol: {0}")]
    Protocol(String),

    /// A frame could not be pushed to the delivery server.
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    /// The connection worker for this address has stopped.
    #[error("connection worker for {address} is not running")]
    WorkerGone { address: String },
}

impl SluiceError {
    pub(crate) fn producer(stream: StreamId, err: impl std::fmt::Display) -> Self {
        SluiceError::ProducerFailure {
            stream,
            reason: err.to_string(),
        }
    }
}

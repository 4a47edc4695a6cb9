//! Response payload carried by a download command: a header block plus a body
//! description that must resolve to a lazy producer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SluiceError;
use crate::flow::StreamId;
use crate::producer::{BodyProducer, ChunkProducer, FileProducer, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Raw HTTP status line and headers, including the blank line.
    pub headers: String,
    pub body: BodySpec,
}

/// Body description. Only the first two shapes can be streamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodySpec {
    File {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk_size: Option<usize>,
    },
    Chunks(Vec<String>),
    Opaque(serde_json::Value),
}

impl BodySpec {
    pub fn is_iterable(&self) -> bool {
        !matches!(self, BodySpec::Opaque(_))
    }

    /// Builds the producer for this body. Opening a file happens here, so an
    /// unreadable file is reported as a producer failure for `stream`.
    pub fn into_producer(self, stream: StreamId) -> Result<Box<dyn BodyProducer>, SluiceError> {
        match self {
            BodySpec::Chunks(chunks) => Ok(Box::new(ChunkProducer::new(chunks))),
            BodySpec::File { file, chunk_size } => {
                let size = chunk_size.filter(|n| *n > 0).unwrap_or(DEFAULT_CHUNK_SIZE);
                let producer = FileProducer::open(&file, size)
                    .map_err(|e| SluiceError::producer(stream, format!("{:#}", e)))?;
                Ok(Box::new(producer))
            }
            BodySpec::Opaque(_) => Err(SluiceError::NotIterable),
        }
    }
}

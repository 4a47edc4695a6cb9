//! Registers a new stream: synchronous first frame, then hand-off to the pacer.
//!
//! The first frame (header block + first body chunk) is pushed before the
//! requester gets its ack, so a failure here is reported to the caller rather
//! than discovered later by the control loop.

use crate::downstream::Downstream;
use crate::error::SluiceError;
use crate::producer::BodyProducer;

use super::job::Job;
use super::table::JobTable;
use super::StreamId;

/// Sends `headers` + first chunk for `stream` and inserts its job.
/// Returns the size of the first frame.
///
/// A producer error on the first chunk rejects the download; nothing is sent
/// and no job is created.
pub fn start_download(
    table: &mut JobTable,
    downstream: &mut dyn Downstream,
    tag: &str,
    stream: StreamId,
    headers: &[u8],
    mut producer: Box<dyn BodyProducer>,
) -> Result<u64, SluiceError> {
    let first_chunk = if producer
        .has_more()
        .map_err(|e| SluiceError::producer(stream, e))?
    {
        producer
            .take_next()
            .map_err(|e| SluiceError::producer(stream, e))?
    } else {
        Vec::new()
    };

    let mut frame = Vec::with_capacity(headers.len() + first_chunk.len());
    frame.extend_from_slice(headers);
    frame.extend_from_slice(&first_chunk);
    let size = frame.len() as u64;

    // An empty frame would end the stream on the server side.
    if !frame.is_empty() {
        downstream.send(tag, stream, &frame)?;
    }

    if table.insert(stream, Job::new(producer, size)).is_some() {
        tracing::warn!(stream_id = %stream, "replaced existing job for stream");
    }
    tracing::info!(
        stream_id = %stream,
        address = downstream.address(),
        first_frame_bytes = size,
        "download started"
    );
    Ok(size)
}

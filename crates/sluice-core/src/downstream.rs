//! The delivery-server connection the core pushes frames into and polls for status.

use std::io;

use crate::flow::StreamId;

/// One established path to a delivery server.
///
/// Implementations are owned by a single connection worker, so `&mut self`
/// is enough; they only need to be `Send` to move onto that worker's thread.
pub trait Downstream: Send {
    /// Best-effort push of one frame for `stream`. An empty payload ends the stream.
    fn send(&mut self, tag: &str, stream: StreamId, payload: &[u8]) -> io::Result<()>;

    /// Sends a raw control query. `None` on timeout or when the control port is down.
    fn control(&mut self, query: &[u8]) -> Option<Vec<u8>>;

    /// Identity download requests are routed by (the handler PUB address).
    fn address(&self) -> &str;
}

/// Builds a handler response frame: `<tag> <len>:<id>, <payload>`.
pub fn encode_frame(tag: &str, stream: StreamId, payload: &[u8]) -> Vec<u8> {
    let id = stream.to_string();
    let mut frame = Vec::with_capacity(tag.len() + id.len() + payload.len() + 16);
    frame.extend_from_slice(tag.as_bytes());
    frame.push(b' ');
    frame.extend_from_slice(id.len().to_string().as_bytes());
    frame.push(b':');
    frame.extend_from_slice(id.as_bytes());
    frame.extend_from_slice(b", ");
    frame.extend_from_slice(payload);
    frame
}

//! Lazy body sources.
//!
//! A producer is pulled one chunk at a time by the pacer, so the full body is
//! never held in memory. Both calls may block on I/O and may fail.

mod chunks;
mod file;

pub use chunks::ChunkProducer;
pub use file::FileProducer;

use std::io;

/// Default read size for file-backed bodies.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Pull-based body source.
pub trait BodyProducer: Send {
    /// True while another chunk can be taken. May read ahead.
    fn has_more(&mut self) -> io::Result<bool>;

    /// Takes the next chunk. Call only after `has_more` returned true.
    fn take_next(&mut self) -> io::Result<Vec<u8>>;
}

pub(crate) fn exhausted() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "body producer is exhausted")
}

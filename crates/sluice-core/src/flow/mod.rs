//! Per-stream flow control.
//!
//! Each downstream connection owns a [`JobTable`]. Once per control tick the
//! connection worker runs [`feedback::poll`] (reconcile flushed-byte counters,
//! reap vanished streams) and then [`pacer::pace_table`] (admit more chunks
//! while both the throughput and the chunk-slot budgets allow).
//! New streams enter through [`intake::start_download`].

pub mod feedback;
pub mod intake;
mod job;
pub mod pacer;
mod table;
mod window;

pub use job::Job;
pub use table::JobTable;
pub use window::{ChunkWindow, MAX_OUTSTANDING_CHUNKS};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Client connection id as known by the delivery server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u64);

impl StreamId {
    /// Maps a status row id to a stream id; negative ids (meta rows) have none.
    pub fn from_row_id(id: i64) -> Option<Self> {
        u64::try_from(id).ok().map(StreamId)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

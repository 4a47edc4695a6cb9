//! Reconciles the server's flushed-byte counters into the job table.
//!
//! The delivery server is the only authority on what has left the machine, and
//! on which clients are still connected: a stream missing from its report is
//! treated as gone.

use crate::downstream::Downstream;
use crate::error::SluiceError;
use crate::status::{parse_status_reply, NetStatusRow, STATUS_NET_QUERY};

use super::table::JobTable;
use super::StreamId;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Jobs found in the report (and marked alive).
    pub confirmed: usize,
    /// Jobs removed because the report no longer lists them.
    pub reaped: Vec<StreamId>,
}

/// Queries `status net` and reconciles the reply into `table`.
///
/// No reply, or an undecodable one, leaves the table untouched and returns an
/// error so the caller can skip this tick for the connection.
pub fn poll(
    table: &mut JobTable,
    downstream: &mut dyn Downstream,
) -> Result<Reconciliation, SluiceError> {
    let raw = downstream
        .control(STATUS_NET_QUERY)
        .ok_or_else(|| SluiceError::ControlChannelUnavailable {
            address: downstream.address().to_string(),
        })?;
    let rows = parse_status_reply(&raw)?;
    Ok(reconcile(table, &rows))
}

/// Applies typed status rows: every job starts the pass dead and its previous
/// confirmed count is snapshotted; listed jobs get their counter updated and
/// are revived; the rest are removed.
pub fn reconcile(table: &mut JobTable, rows: &[NetStatusRow]) -> Reconciliation {
    for (_, job) in table.iter_mut() {
        job.begin_reconcile();
    }

    let mut confirmed = 0;
    for row in rows.iter().filter(|r| !r.is_meta()) {
        let Some(stream) = StreamId::from_row_id(row.id) else {
            continue;
        };
        if let Some(job) = table.get_mut(stream) {
            job.confirm(row.bytes_written);
            confirmed += 1;
        }
    }

    let reaped = table.reap_dead();
    for stream in &reaped {
        tracing::info!(stream_id = %stream, "client gone from server status; dropping job");
    }
    Reconciliation { confirmed, reaped }
}

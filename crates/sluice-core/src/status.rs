//! `status net` query and reply parsing for the delivery server's control port.
//!
//! Rows are converted to [`NetStatusRow`] right after decode so nothing
//! downstream indexes into raw tuples.

use crate::error::SluiceError;
use crate::tnetstring::{self, Value};

/// `["status", {"what": "net"}]`, pre-encoded.
pub const STATUS_NET_QUERY: &[u8] = b"26:6:status,13:4:what,3:net,}]";

/// Id used by the server for rows that do not describe a client connection.
pub const META_ROW_ID: i64 = -1;

/// Number of fields in a `status net` row.
const ROW_WIDTH: usize = 8;

/// One connection as reported by `status net`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetStatusRow {
    pub id: i64,
    pub fd: i64,
    pub kind: i64,
    pub last_ping: i64,
    pub last_read: i64,
    pub last_write: i64,
    pub bytes_read: i64,
    /// Cumulative bytes flushed to the client for this connection.
    pub bytes_written: i64,
}

impl NetStatusRow {
    /// Row for a live client connection with only the fields the pacer reads set.
    pub fn connection(id: i64, bytes_written: i64) -> Self {
        Self {
            id,
            fd: 0,
            kind: 0,
            last_ping: 0,
            last_read: 0,
            last_write: 0,
            bytes_read: 0,
            bytes_written,
        }
    }

    pub fn is_meta(&self) -> bool {
        self.id == META_ROW_ID
    }

    fn from_fields(fields: &[Value]) -> Option<Self> {
        if fields.len() < ROW_WIDTH {
            return None;
        }
        let n = |i: usize| fields[i].as_i64();
        Some(Self {
            id: n(0)?,
            fd: n(1).unwrap_or(0),
            kind: n(2).unwrap_or(0),
            last_ping: n(3).unwrap_or(0),
            last_read: n(4).unwrap_or(0),
            last_write: n(5).unwrap_or(0),
            bytes_read: n(6).unwrap_or(0),
            bytes_written: n(7)?,
        })
    }
}

/// Decodes a `status net` reply into typed rows.
///
/// `rows` may be a list of rows or, when the server flattens a single
/// connection, one row; both mean the same thing. Rows that are too short or
/// carry non-integer id/bytes fields are dropped.
pub fn parse_status_reply(raw: &[u8]) -> Result<Vec<NetStatusRow>, SluiceError> {
    let value =
        tnetstring::decode(raw).map_err(|e| SluiceError::Protocol(format!("status reply: {e}")))?;
    let rows = value
        .get("rows")
        .ok_or_else(|| SluiceError::Protocol("status reply has no rows field".into()))?;
    let items = rows
        .as_list()
        .ok_or_else(|| SluiceError::Protocol("status rows is not a list".into()))?;

    let single_row = items.first().is_some_and(|first| first.as_list().is_none());
    let raw_rows: Vec<&[Value]> = if single_row {
        vec![items]
    } else {
        items.iter().filter_map(Value::as_list).collect()
    };

    let mut out = Vec::with_capacity(raw_rows.len());
    for fields in raw_rows {
        match NetStatusRow::from_fields(fields) {
            Some(row) => out.push(row),
            None => tracing::debug!(width = fields.len(), "skipping malformed status row"),
        }
    }
    Ok(out)
}

/// Encodes rows back into a reply; used by test doubles standing in for the server.
pub fn encode_status_reply(rows: &[NetStatusRow]) -> Vec<u8> {
    let headers = [
        "id", "fd", "type", "last_ping", "last_read", "last_write", "bytes_read",
        "bytes_written",
    ];
    let rows = rows
        .iter()
        .map(|r| {
            Value::List(
                [
                    r.id, r.fd, r.kind, r.last_ping, r.last_read, r.last_write, r.bytes_read,
                    r.bytes_written,
                ]
                .into_iter()
                .map(Value::Integer)
                .collect(),
            )
        })
        .collect();
    tnetstring::encode(&Value::Dict(vec![
        (
            b"headers".to_vec(),
            Value::List(headers.iter().map(|h| Value::str(h)).collect()),
        ),
        (b"rows".to_vec(), Value::List(rows)),
    ]))
}

//! Test doubles for unit tests: a downstream that records frames and serves
//! canned status replies, and misbehaving producers.

use std::io;
use std::time::Duration;

use crate::downstream::Downstream;
use crate::flow::StreamId;
use crate::producer::BodyProducer;
use crate::status::{encode_status_reply, NetStatusRow};

enum Reply {
    Rows(Vec<NetStatusRow>),
    Raw(Vec<u8>),
    Unavailable,
}

pub struct RecordingDownstream {
    address: String,
    frames: Vec<(String, StreamId, Vec<u8>)>,
    reply: Reply,
    control_calls: usize,
    last_query: Option<Vec<u8>>,
    fail_sends: bool,
}

impl RecordingDownstream {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            frames: Vec::new(),
            reply: Reply::Rows(Vec::new()),
            control_calls: 0,
            last_query: None,
            fail_sends: false,
        }
    }

    pub fn set_rows(&mut self, rows: Vec<NetStatusRow>) {
        self.reply = Reply::Rows(rows);
    }

    pub fn set_raw_reply(&mut self, raw: Vec<u8>) {
        self.reply = Reply::Raw(raw);
    }

    pub fn set_unavailable(&mut self) {
        self.reply = Reply::Unavailable;
    }

    pub fn fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    pub fn frames(&self) -> &[(String, StreamId, Vec<u8>)] {
        &self.frames
    }

    pub fn frame_sizes(&self, stream: StreamId) -> Vec<usize> {
        self.frames
            .iter()
            .filter(|(_, s, _)| *s == stream)
            .map(|(_, _, p)| p.len())
            .collect()
    }

    pub fn end_frames(&self, stream: StreamId) -> usize {
        self.frame_sizes(stream).iter().filter(|n| **n == 0).count()
    }

    pub fn control_calls(&self) -> usize {
        self.control_calls
    }

    pub fn last_query(&self) -> Option<Vec<u8>> {
        self.last_query.clone()
    }
}

impl Downstream for RecordingDownstream {
    fn send(&mut self, tag: &str, stream: StreamId, payload: &[u8]) -> io::Result<()> {
        if self.fail_sends {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "send refused"));
        }
        self.frames.push((tag.to_string(), stream, payload.to_vec()));
        Ok(())
    }

    fn control(&mut self, query: &[u8]) -> Option<Vec<u8>> {
        self.control_calls += 1;
        self.last_query = Some(query.to_vec());
        match &self.reply {
            Reply::Rows(rows) => Some(encode_status_reply(rows)),
            Reply::Raw(raw) => Some(raw.clone()),
            Reply::Unavailable => None,
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Yields `ok_chunks` chunks of 10 bytes, then fails every call.
pub struct FailingProducer {
    ok_chunks: usize,
}

impl FailingProducer {
    pub fn after(ok_chunks: usize) -> Self {
        Self { ok_chunks }
    }
}

impl BodyProducer for FailingProducer {
    fn has_more(&mut self) -> io::Result<bool> {
        if self.ok_chunks == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "source broke"));
        }
        Ok(true)
    }

    fn take_next(&mut self) -> io::Result<Vec<u8>> {
        self.has_more()?;
        self.ok_chunks -= 1;
        Ok(vec![0u8; 10])
    }
}

/// Endless producer whose every `take_next` sleeps first.
pub struct SlowProducer {
    pub delay: Duration,
}

impl BodyProducer for SlowProducer {
    fn has_more(&mut self) -> io::Result<bool> {
        Ok(true)
    }

    fn take_next(&mut self) -> io::Result<Vec<u8>> {
        std::thread::sleep(self.delay);
        Ok(vec![1u8; 10])
    }
}

/// Never runs out, but every chunk it yields is empty.
pub struct EmptyProducer;

impl BodyProducer for EmptyProducer {
    fn has_more(&mut self) -> io::Result<bool> {
        Ok(true)
    }

    fn take_next(&mut self) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

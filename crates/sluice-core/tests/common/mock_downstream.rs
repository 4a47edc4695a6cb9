//! In-process delivery server: records frames and answers `status net` as if
//! every connected client had already received everything sent to it.

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use sluice_core::downstream::Downstream;
use sluice_core::status::{encode_status_reply, NetStatusRow, META_ROW_ID};
use sluice_core::StreamId;

#[derive(Default)]
struct State {
    frames: Vec<(StreamId, Vec<u8>)>,
    gone: HashSet<StreamId>,
    control_down: bool,
    control_calls: usize,
}

/// Clones share state, so a test keeps one handle and gives another to the worker.
#[derive(Clone)]
pub struct MockDownstream {
    address: String,
    state: Arc<Mutex<State>>,
}

impl MockDownstream {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: Arc::default(),
        }
    }

    pub fn boxed(&self) -> Box<dyn Downstream> {
        Box::new(self.clone())
    }

    /// The client hangs up: it disappears from status replies.
    pub fn disconnect(&self, stream: StreamId) {
        self.state.lock().unwrap().gone.insert(stream);
    }

    pub fn set_control_down(&self, down: bool) {
        self.state.lock().unwrap().control_down = down;
    }

    pub fn frames_for(&self, stream: StreamId) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .frames
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn frame_sizes(&self, stream: StreamId) -> Vec<usize> {
        self.frames_for(stream).iter().map(Vec::len).collect()
    }

    pub fn ended(&self, stream: StreamId) -> bool {
        self.frames_for(stream).iter().any(Vec::is_empty)
    }

    pub fn total_frames(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }

    pub fn control_calls(&self) -> usize {
        self.state.lock().unwrap().control_calls
    }
}

impl Downstream for MockDownstream {
    fn send(&mut self, _tag: &str, stream: StreamId, payload: &[u8]) -> io::Result<()> {
        self.state
            .lock()
            .unwrap()
            .frames
            .push((stream, payload.to_vec()));
        Ok(())
    }

    fn control(&mut self, _query: &[u8]) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.control_calls += 1;
        if state.control_down {
            return None;
        }
        let mut rows = vec![NetStatusRow::connection(META_ROW_ID, 0)];
        let mut seen: Vec<StreamId> = Vec::new();
        for (stream, _) in &state.frames {
            if !seen.contains(stream) && !state.gone.contains(stream) {
                seen.push(*stream);
            }
        }
        for stream in seen {
            let written: usize = state
                .frames
                .iter()
                .filter(|(s, _)| *s == stream)
                .map(|(_, p)| p.len())
                .sum();
            rows.push(NetStatusRow::connection(stream.0 as i64, written as i64));
        }
        Some(encode_status_reply(&rows))
    }

    fn address(&self) -> &str {
        &self.address
    }
}

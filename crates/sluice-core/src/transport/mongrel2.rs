//! Mongrel2 handler transport over ZeroMQ.
//!
//! Frames go out on a PUB socket connected to the server's handler subscribe
//! address; status queries go over a REQ socket to its control port. A REQ
//! socket that timed out is stuck mid-request, so it is dropped and rebuilt
//! before the next query.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{DownstreamServer, SluiceConfig};
use crate::downstream::{encode_frame, Downstream};
use crate::flow::StreamId;

pub struct ZmqDownstream {
    context: zmq::Context,
    server: DownstreamServer,
    publisher: zmq::Socket,
    control: Option<zmq::Socket>,
    timeout_ms: i32,
}

impl ZmqDownstream {
    pub fn connect(
        context: &zmq::Context,
        server: DownstreamServer,
        sender_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let publisher = context.socket(zmq::PUB)?;
        publisher.set_identity(sender_id.as_bytes())?;
        publisher
            .connect(&server.pub_addr)
            .with_context(|| format!("connect PUB socket to {}", server.pub_addr))?;
        tracing::info!(pub_addr = %server.pub_addr, ctrl_addr = %server.ctrl_addr, "connected to delivery server");
        Ok(Self {
            context: context.clone(),
            server,
            publisher,
            control: None,
            timeout_ms: i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX),
        })
    }

    fn control_socket(&mut self) -> zmq::Result<&zmq::Socket> {
        if self.control.is_none() {
            let socket = self.context.socket(zmq::REQ)?;
            socket.set_linger(0)?;
            socket.set_rcvtimeo(self.timeout_ms)?;
            socket.set_sndtimeo(self.timeout_ms)?;
            socket.connect(&self.server.ctrl_addr)?;
            self.control = Some(socket);
        }
        self.control.as_ref().ok_or(zmq::Error::ENOTSOCK)
    }

    fn request(&mut self, query: &[u8]) -> zmq::Result<Vec<u8>> {
        let socket = self.control_socket()?;
        socket.send(query, 0)?;
        socket.recv_bytes(0)
    }
}

impl Downstream for ZmqDownstream {
    fn send(&mut self, tag: &str, stream: StreamId, payload: &[u8]) -> io::Result<()> {
        let frame = encode_frame(tag, stream, payload);
        self.publisher
            .send(frame, 0)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn control(&mut self, query: &[u8]) -> Option<Vec<u8>> {
        match self.request(query) {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(ctrl_addr = %self.server.ctrl_addr, "control query failed: {}", e);
                self.control = None;
                None
            }
        }
    }

    fn address(&self) -> &str {
        &self.server.pub_addr
    }
}

/// Connects to every usable server in `cfg`, sharing one ZeroMQ context.
pub fn connect_servers(cfg: &SluiceConfig) -> Result<Vec<Box<dyn Downstream>>> {
    let context = zmq::Context::new();
    let mut out: Vec<Box<dyn Downstream>> = Vec::new();
    for server in cfg.usable_servers()? {
        let downstream =
            ZmqDownstream::connect(&context, server, &cfg.sender_id, cfg.control_timeout())?;
        out.push(Box::new(downstream));
    }
    Ok(out)
}

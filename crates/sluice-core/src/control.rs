//! Inbound command protocol: one JSON command per line, one JSON ack back.
//!
//! `{"action":"download","id":7,"downstreamAddress":"tcp://...","responsePayload":{...}}`
//! is answered with `{"ok":true}` or `{"ok":false,"msg":"..."}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::flow::StreamId;
use crate::response::ResponsePayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Download(DownloadCommand),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadCommand {
    pub id: StreamId,
    pub downstream_address: String,
    pub response_payload: ResponsePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true, msg: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            msg: Some(msg.into()),
        }
    }

    pub fn unknown_action() -> Self {
        Self::error("Unknown action")
    }
}

pub fn parse_command(line: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(line.trim())
}

/// Default path for the control socket (XDG state dir).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("sluice")?.get_state_home();
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::BodySpec;

    #[test]
    fn parses_download_command() {
        let line = r#"{"action":"download","id":42,"downstreamAddress":"tcp://127.0.0.1:9997",
            "responsePayload":{"headers":"HTTP/1.1 200 OK\r\n\r\n","body":["abc"]}}"#;
        let Command::Download(cmd) = parse_command(line).unwrap() else {
            panic!("expected download");
        };
        assert_eq!(cmd.id, StreamId(42));
        assert_eq!(cmd.downstream_address, "tcp://127.0.0.1:9997");
        assert_eq!(cmd.response_payload.body, BodySpec::Chunks(vec!["abc".into()]));
    }

    #[test]
    fn unknown_action_is_recognised() {
        assert_eq!(parse_command(r#"{"action":"pause","id":1}"#).unwrap(), Command::Unknown);
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(parse_command("not json").is_err());
        assert!(parse_command(r#"{"id":1}"#).is_err());
    }

    #[test]
    fn ack_wire_form() {
        assert_eq!(serde_json::to_string(&Ack::ok()).unwrap(), r#"{"ok":true}"#);
        assert_eq!(
            serde_json::to_string(&Ack::unknown_action()).unwrap(),
            r#"{"ok":false,"msg":"Unknown action"}"#
        );
    }
}

//! `sluice download <id>` – ask the running worker to stream a file to client `<id>`.

use anyhow::{Context, Result};
use sluice_core::config::SluiceConfig;
use sluice_core::control::{Command, DownloadCommand};
use sluice_core::response::{BodySpec, ResponsePayload};
use sluice_core::StreamId;
use std::path::{Path, PathBuf};

use crate::cli::control_socket;

use super::control_socket_path;

#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub id: u64,
    pub downstream: String,
    pub file: PathBuf,
    pub headers_file: Option<PathBuf>,
    pub chunk_size: Option<usize>,
}

pub async fn run_download(cfg: &SluiceConfig, args: DownloadArgs) -> Result<()> {
    let cmd = build_command(args)?;
    let id = cmd.id;
    let socket_path = control_socket_path(cfg)?;
    let ack = control_socket::send_command(&socket_path, &Command::Download(cmd)).await?;
    if ack.ok {
        println!("Streaming to client {}", id);
        Ok(())
    } else {
        anyhow::bail!(
            "download rejected: {}",
            ack.msg.unwrap_or_else(|| "no reason given".to_string())
        )
    }
}

fn build_command(args: DownloadArgs) -> Result<DownloadCommand> {
    // The worker opens the file, possibly from another working directory.
    let file = std::fs::canonicalize(&args.file)
        .with_context(|| format!("body file {}", args.file.display()))?;
    let headers = match &args.headers_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read headers file {}", path.display()))?,
        None => default_headers(&file)?,
    };
    Ok(DownloadCommand {
        id: StreamId(args.id),
        downstream_address: args.downstream,
        response_payload: ResponsePayload {
            headers,
            body: BodySpec::File {
                file,
                chunk_size: args.chunk_size,
            },
        },
    })
}

fn default_headers(file: &Path) -> Result<String> {
    let len = std::fs::metadata(file)?.len();
    Ok(format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
        len
    ))
}

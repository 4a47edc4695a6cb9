//! Control socket: server (during `sluice run`) and client (for `sluice download`).
//! Protocol: one JSON command per line, answered by one JSON ack line.

use anyhow::{Context, Result};
use sluice_core::control::{Ack, Command};
use sluice_core::scheduler::Dispatcher;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Binds `path` and spawns a task that answers each command line through the
/// dispatcher. A stale socket file from a previous run is replaced.
pub fn spawn_control_listener(
    dispatcher: Arc<Dispatcher>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("bind control socket {}", path.display()))?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(&dispatcher, stream).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(dispatcher: &Dispatcher, stream: UnixStream) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let ack = dispatcher.handle_line(&line).await;
        let mut out = serde_json::to_vec(&ack)?;
        out.push(b'\n');
        write.write_all(&out).await?;
    }
    Ok(())
}

/// Sends one command to a running worker and returns its ack.
pub async fn send_command(socket_path: &Path, command: &Command) -> Result<Ack> {
    let stream = UnixStream::connect(socket_path).await.with_context(|| {
        format!(
            "connect to {} (is `sluice run` active?)",
            socket_path.display()
        )
    })?;
    let (read, mut write) = stream.into_split();
    let mut msg = serde_json::to_vec(command)?;
    msg.push(b'\n');
    write.write_all(&msg).await?;

    let mut lines = BufReader::new(read).lines();
    let line = lines
        .next_line()
        .await?
        .context("control socket closed without an ack")?;
    Ok(serde_json::from_str(&line)?)
}

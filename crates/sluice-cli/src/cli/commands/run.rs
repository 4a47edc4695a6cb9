//! `sluice run` – connect to the delivery servers and serve download commands until Ctrl-C.

use anyhow::Result;
use sluice_core::config::SluiceConfig;
use sluice_core::scheduler::Dispatcher;
use std::sync::Arc;

use crate::cli::control_socket;

use super::{connect_downstreams, control_socket_path};

pub async fn run_server(cfg: &SluiceConfig) -> Result<()> {
    let downstreams = connect_downstreams(cfg)?;
    let dispatcher = Arc::new(Dispatcher::from_downstreams(downstreams, cfg)?);

    let socket_path = control_socket_path(cfg)?;
    let listener = control_socket::spawn_control_listener(Arc::clone(&dispatcher), &socket_path)?;
    tracing::info!(
        path = %socket_path.display(),
        servers = ?dispatcher.addresses(),
        "download worker ready"
    );
    println!(
        "Serving {} delivery server(s); commands on {}",
        dispatcher.addresses().len(),
        socket_path.display()
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    listener.abort();
    let _ = std::fs::remove_file(&socket_path);
    tokio::task::spawn_blocking(move || dispatcher.shutdown()).await?;
    Ok(())
}

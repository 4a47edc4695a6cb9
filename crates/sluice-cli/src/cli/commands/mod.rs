//! CLI command handlers. Each command is in its own file.

mod download;
mod run;
mod status;

pub use download::{run_download, DownloadArgs};
pub use run::run_server;
pub use status::run_status;

use anyhow::Result;
use sluice_core::config::SluiceConfig;
use sluice_core::downstream::Downstream;
use std::path::PathBuf;

/// Control socket path: config override, else the XDG state dir.
fn control_socket_path(cfg: &SluiceConfig) -> Result<PathBuf> {
    match &cfg.control_socket {
        Some(path) => Ok(path.clone()),
        None => Ok(sluice_core::control::default_control_socket_path()?),
    }
}

/// Opens one transport per usable server in the config.
#[cfg(feature = "mongrel2")]
fn connect_downstreams(cfg: &SluiceConfig) -> Result<Vec<Box<dyn Downstream>>> {
    sluice_core::transport::connect_servers(cfg)
}

#[cfg(not(feature = "mongrel2"))]
fn connect_downstreams(cfg: &SluiceConfig) -> Result<Vec<Box<dyn Downstream>>> {
    cfg.usable_servers()?;
    anyhow::bail!("this build has no delivery server transport; rebuild with `--features mongrel2`")
}

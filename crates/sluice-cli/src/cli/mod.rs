//! CLI for the sluice download worker.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sluice_core::config;
use std::path::PathBuf;

use commands::{run_download, run_server, run_status, DownloadArgs};

/// Top-level CLI for the sluice download worker.
#[derive(Debug, Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice: paced large-body streaming through a Mongrel2 delivery server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the download worker: one connection per configured server, commands on the control socket.
    Run,

    /// Ask a running worker to stream a file to a connected client.
    Download {
        /// Client connection id on the delivery server.
        id: u64,

        /// Handler PUB address of the server the client is connected to.
        #[arg(long, value_name = "ADDR")]
        downstream: String,

        /// File to stream as the response body.
        #[arg(long)]
        file: PathBuf,

        /// Raw HTTP status line and headers (default: 200 with Content-Length).
        #[arg(long, value_name = "PATH")]
        headers_file: Option<PathBuf>,

        /// Body chunk size in bytes.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,
    },

    /// Show the connection table of each configured server.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run => run_server(&cfg).await?,
            CliCommand::Download {
                id,
                downstream,
                file,
                headers_file,
                chunk_size,
            } => {
                let args = DownloadArgs {
                    id,
                    downstream,
                    file,
                    headers_file,
                    chunk_size,
                };
                run_download(&cfg, args).await?;
            }
            CliCommand::Status => run_status(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

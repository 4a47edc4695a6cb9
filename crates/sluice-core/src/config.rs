use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SluiceError;

/// Default floor for the per-tick target buffer size (1 MiB).
pub const DEFAULT_MIN_TARGET_BYTES: u64 = 1024 * 1024;

/// Pacing parameters (optional section in config.toml). Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Lower bound for the bytes kept in flight per stream, whatever the observed throughput.
    pub min_target_bytes: u64,
    /// If set, a single producer call taking longer than this fails the job.
    pub producer_deadline_ms: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_target_bytes: DEFAULT_MIN_TARGET_BYTES,
            producer_deadline_ms: None,
        }
    }
}

/// One delivery server entry. Entries without both addresses are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Handler PUB address; also the identity download requests are routed by.
    #[serde(default)]
    pub pub_addr: Option<String>,
    /// Control port address (status queries).
    #[serde(default)]
    pub ctrl_addr: Option<String>,
}

/// A server entry with both addresses present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamServer {
    pub pub_addr: String,
    pub ctrl_addr: String,
}

/// Global configuration loaded from `~/.config/sluice/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SluiceConfig {
    /// Sender tag prefixed to every frame pushed to the delivery server.
    pub sender_id: String,
    /// Control tick cadence in milliseconds.
    pub tick_interval_ms: u64,
    /// Receive/send timeout for status queries on the control port.
    pub control_timeout_ms: u64,
    /// Unix socket for inbound download commands (None = XDG state dir).
    #[serde(default)]
    pub control_socket: Option<PathBuf>,
    /// Optional pacing overrides; if missing, built-in defaults are used.
    #[serde(default)]
    pub pacing: Option<PacingConfig>,
    /// Delivery servers to stream through.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Default for SluiceConfig {
    fn default() -> Self {
        Self {
            sender_id: "sluice-download".to_string(),
            tick_interval_ms: 1000,
            control_timeout_ms: 500,
            control_socket: None,
            pacing: None,
            servers: Vec::new(),
        }
    }
}

impl SluiceConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    pub fn pacing(&self) -> PacingConfig {
        self.pacing.clone().unwrap_or_default()
    }

    /// Servers with both a PUB and a control address. Fails with
    /// `ConfigurationMissing` when there are none.
    pub fn usable_servers(&self) -> Result<Vec<DownstreamServer>, SluiceError> {
        let mut out = Vec::new();
        for (index, server) in self.servers.iter().enumerate() {
            match (&server.pub_addr, &server.ctrl_addr) {
                (Some(pub_addr), Some(ctrl_addr)) => {
                    tracing::info!(index, pub_addr = %pub_addr, ctrl_addr = %ctrl_addr, "delivery server");
                    out.push(DownstreamServer {
                        pub_addr: pub_addr.clone(),
                        ctrl_addr: ctrl_addr.clone(),
                    });
                }
                _ => tracing::warn!(index, "ignoring server without pub_addr or ctrl_addr"),
            }
        }
        if out.is_empty() {
            return Err(SluiceError::ConfigurationMissing);
        }
        Ok(out)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sluice")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SluiceConfig> {
    load_or_init_at(config_path()?)
}

pub fn load_or_init_at(path: PathBuf) -> Result<SluiceConfig> {
    if !path.exists() {
        let default_cfg = SluiceConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SluiceConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#![allow(dead_code)]

pub mod mock_downstream;

use std::time::{Duration, Instant};

use sluice_core::config::SluiceConfig;

/// Config with a fast control tick so tests finish quickly.
pub fn fast_config() -> SluiceConfig {
    SluiceConfig {
        tick_interval_ms: 10,
        ..SluiceConfig::default()
    }
}

/// Polls `cond` until it holds or `timeout` elapses. Returns the final result.
pub async fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

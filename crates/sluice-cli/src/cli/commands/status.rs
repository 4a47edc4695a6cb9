//! `sluice status` – show each configured server's connection table.

use anyhow::Result;
use sluice_core::config::SluiceConfig;
use sluice_core::status::{parse_status_reply, NetStatusRow, STATUS_NET_QUERY};

use super::connect_downstreams;

pub fn run_status(cfg: &SluiceConfig) -> Result<()> {
    for mut downstream in connect_downstreams(cfg)? {
        println!("{}", downstream.address());
        let Some(raw) = downstream.control(STATUS_NET_QUERY) else {
            println!("  (no reply from control port)");
            continue;
        };
        match parse_status_reply(&raw) {
            Ok(rows) => print_rows(&rows),
            Err(e) => println!("  (unreadable reply: {})", e),
        }
    }
    Ok(())
}

fn print_rows(rows: &[NetStatusRow]) {
    let clients: Vec<&NetStatusRow> = rows.iter().filter(|r| !r.is_meta()).collect();
    if clients.is_empty() {
        println!("  No client connections.");
        return;
    }
    println!(
        "  {:<8} {:<6} {:<12} {:<12} {}",
        "ID", "FD", "LAST_WRITE", "BYTES_READ", "BYTES_WRITTEN"
    );
    for row in clients {
        println!(
            "  {:<8} {:<6} {:<12} {:<12} {}",
            row.id, row.fd, row.last_write, row.bytes_read, row.bytes_written
        );
    }
}

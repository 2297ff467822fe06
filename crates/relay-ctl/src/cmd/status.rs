//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    uptime_secs: u64,
    active_tasks: usize,
    events_recorded: usize,
    last_activity: Option<u64>,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Relay Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Status          : {}", resp.status);
    println!("  Uptime          : {}s", resp.uptime_secs);
    println!("  Active tasks    : {}", resp.active_tasks);
    println!("  Events recorded : {}", resp.events_recorded);
    match resp.last_activity {
        Some(ms) => println!("  Last activity   : {} (unix ms)", ms),
        None => println!("  Last activity   : none"),
    }

    Ok(())
}

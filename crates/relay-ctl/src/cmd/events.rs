//! Recent events command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<EventJson>,
}

#[derive(Deserialize)]
struct EventJson {
    timestamp: u64,
    kind: String,
    payload: serde_json::Value,
}

pub async fn cmd_events(port: u16) -> Result<()> {
    let resp: EventsResponse = get_json(&format!("{}/events", base_url(port))).await?;

    if resp.events.is_empty() {
        println!("No events recorded.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Recent Events ({})", resp.events.len());
    println!("═══════════════════════════════════════");

    for e in &resp.events {
        println!("  ┌─ {} [{}]", e.kind, e.timestamp);
        if let Some(task) = e.payload.get("task").and_then(|v| v.as_str()) {
            println!("  │  task    : {}", task);
        }
        println!("  └─ payload : {}", e.payload);
    }

    Ok(())
}

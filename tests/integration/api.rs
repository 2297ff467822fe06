use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use relay_api::ApiState;
use relay_services::{MemoryTransport, Relay, RelayOptions};
use serde_json::{json, Value};

use crate::*;

/// Serve the API on an ephemeral port. Returns the base URL.
async fn spawn_api(transport: &MemoryTransport) -> Result<String> {
    let relay = Relay::new(
        signer(),
        Arc::new(transport.clone()),
        Scripted::answer(0, "pong"),
        RelayOptions::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, relay_api::router(ApiState::new(relay))).await;
    });
    Ok(format!("http://{addr}/api"))
}

async fn wait_for_text(transport: &MemoryTransport, task: &relay_core::Task, expect: &str) -> bool {
    for _ in 0..100 {
        if transport.text(&task.message()).as_deref() == Some(expect) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_process_over_http() -> Result<()> {
    let transport = MemoryTransport::new();
    let base = spawn_api(&transport).await?;
    let client = reqwest::Client::new();
    let task = signed("ping");

    let resp = client.post(format!("{base}/process")).json(&task).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    let body: Value = resp.json().await?;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["task_id"], task.message().short_id());

    assert!(wait_for_text(&transport, &task, "🤖 pong").await);

    let status: Value = client.get(format!("{base}/status")).send().await?.json().await?;
    assert_eq!(status["status"], "running");
    assert!(status["events_recorded"].as_u64().unwrap() >= 1);

    let events: Value = client.get(format!("{base}/events")).send().await?.json().await?;
    let kinds: Vec<&str> = events["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert_eq!(kinds.last(), Some(&"task_accepted"), "latest first");
    Ok(())
}

#[tokio::test]
async fn test_rejections_over_http() -> Result<()> {
    let transport = MemoryTransport::new();
    let base = spawn_api(&transport).await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/process"))
        .json(&json!({ "prompt": "p", "channel": "C1" }))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(resp.text().await?.contains("ts, sig"));

    let mut task = signed("ping");
    task.ts = "1718000000.000999".into();
    let resp = client.post(format!("{base}/process")).json(&task).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(resp.text().await?, "invalid signature");

    let resp = client
        .post(format!("{base}/update"))
        .json(&json!({
            "channel": "C042",
            "ts": "1718000000.000100",
            "text": "forged",
            "prompt": "ping",
            "sig": "deadbeef",
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);

    assert!(transport.ops().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_over_http() -> Result<()> {
    let transport = MemoryTransport::new();
    let base = spawn_api(&transport).await?;
    let task = signed("ping");

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/update"))
        .json(&json!({
            "channel": task.channel,
            "ts": task.ts,
            "text": "[docs](https://docs.rs)",
            "prompt": task.prompt,
            "sig": task.sig,
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body, json!({ "success": true, "delivery": "direct" }));
    assert_eq!(
        transport.text(&task.message()).as_deref(),
        Some("🤖 <https://docs.rs|docs>")
    );
    Ok(())
}

#[tokio::test]
async fn test_cors_is_permissive() -> Result<()> {
    let transport = MemoryTransport::new();
    let base = spawn_api(&transport).await?;

    let resp = reqwest::Client::new()
        .get(format!("{base}/status"))
        .header("Origin", "https://viewer.example")
        .send()
        .await?;
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}

#[tokio::test]
async fn test_direct_generation_over_http() -> Result<()> {
    let transport = MemoryTransport::new();
    let base = spawn_api(&transport).await?;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/ai"))
        .json(&json!({ "message": "ping" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body, json!({ "success": true, "response": "pong", "model": "unknown" }));

    let resp = client.post(format!("{base}/ai")).json(&json!({})).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(transport.ops().is_empty());
    Ok(())
}

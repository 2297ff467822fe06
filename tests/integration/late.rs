use std::time::Duration;

use relay_core::{CompletionUpdate, GenerationError};
use relay_services::{MemoryTransport, RelayOutcome};
use tokio::time::sleep;

use crate::*;

/// An answer arriving after the deadline replaces the timeout banner.
#[tokio::test(start_paused = true)]
async fn test_late_answer_replaces_banner() {
    let transport = MemoryTransport::new();
    let task = signed("long one");
    let relay = relay(&transport, Scripted::answer(20, "finally"), |s| s.deadline_secs = 7);

    let outcome = relay.process(task.clone()).await.unwrap();
    assert_eq!(outcome, RelayOutcome::TimedOut { wrote_banner: true });

    sleep(Duration::from_secs(15)).await;
    assert_eq!(transport.text(&task.message()).as_deref(), Some("🤖 finally"));
    assert_eq!(answers(&transport).len(), 1);
}

/// A late answer never overwrites one the live view already delivered.
#[tokio::test(start_paused = true)]
async fn test_late_answer_yields_to_live_view() {
    let transport = MemoryTransport::new();
    let task = signed("long one");
    let relay = relay(&transport, Scripted::answer(20, "from the backend"), |s| {
        s.deadline_secs = 7
    });

    relay.process(task.clone()).await.unwrap();

    sleep(Duration::from_secs(3)).await;
    relay
        .complete(CompletionUpdate {
            channel: task.channel.clone(),
            ts: task.ts.clone(),
            text: "from the live view".into(),
            prompt: task.prompt.clone(),
            sig: task.sig.clone(),
        })
        .await
        .unwrap();

    sleep(Duration::from_secs(20)).await;
    assert_eq!(
        transport.text(&task.message()).as_deref(),
        Some("🤖 from the live view")
    );
    assert_eq!(answers(&transport).len(), 1);
}

/// A late failure is logged only; the timeout banner stays.
#[tokio::test(start_paused = true)]
async fn test_late_failure_leaves_banner() {
    let transport = MemoryTransport::new();
    let task = signed("long one");
    let relay = relay(
        &transport,
        Scripted::fail(20, GenerationError::Backend("overloaded".into())),
        |s| s.deadline_secs = 7,
    );

    relay.process(task.clone()).await.unwrap();
    let settled = transport.ops().len();

    sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.ops().len(), settled);
    assert!(transport
        .text(&task.message())
        .unwrap()
        .starts_with("⚠️ Response taking too long."));
}

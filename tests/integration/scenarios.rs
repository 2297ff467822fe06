use std::sync::Arc;
use std::time::Duration;

use relay_core::{CompletionUpdate, GenerationError, MessageRef, RelayError, Task};
use relay_services::{Delivery, MemoryTransport, Relay, RelayOptions, RelayOutcome, TransportOp};
use tokio::time::{sleep, timeout};

use crate::*;

/// Fast answer: one finalized write, ticker silent afterwards, no fallback.
#[tokio::test(start_paused = true)]
async fn test_answer_before_deadline() {
    let transport = MemoryTransport::new();
    let task = signed("What is 2+2?");
    let relay = relay(&transport, Scripted::answer(2, "**4**"), |s| s.deadline_secs = 25);

    let outcome = relay.process(task.clone()).await.unwrap();
    assert_eq!(outcome, RelayOutcome::Answered(Delivery::Direct));
    assert_eq!(answers(&transport), vec!["🤖 *4*"]);
    assert_eq!(transport.writes().last().unwrap(), "🤖 *4*");

    let settled = transport.ops().len();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.ops().len(), settled, "ticker wrote after the answer");
    assert!(!transport.writes().iter().any(|w| w.contains("taking too long")));
    assert_eq!(relay.active_tasks(), 0);
}

/// Deadline: the message is read before the single timeout banner is written.
#[tokio::test(start_paused = true)]
async fn test_deadline_reads_then_writes_banner() {
    let transport = MemoryTransport::new();
    let task = signed("Write me an epic");
    transport.post(task.message(), "⏳ Asking AI...");
    let relay = relay(&transport, Scripted::never(), |s| s.deadline_secs = 7);

    let outcome = relay.process(task.clone()).await.unwrap();
    assert_eq!(outcome, RelayOutcome::TimedOut { wrote_banner: true });

    sleep(Duration::from_secs(30)).await;
    let ops = transport.ops();
    let read_at = ops
        .iter()
        .position(|op| matches!(op, TransportOp::Read(_)))
        .expect("detector read");
    let banners: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| {
            matches!(op, TransportOp::Write { text, .. } if text.contains("Response taking too long"))
        })
        .map(|(i, _)| i)
        .collect();

    assert_eq!(banners.len(), 1);
    assert!(read_at < banners[0]);
    assert_eq!(banners[0], ops.len() - 1, "no tick after the banner");

    // Frames at 2, 4 and 6s between the starting banner and the deadline.
    let frames = transport
        .writes()
        .iter()
        .filter(|w| w.contains("View Live Response") && w.contains('['))
        .count();
    assert_eq!(frames, 3);
}

/// A message the live view already finalized is left alone at the deadline.
#[tokio::test(start_paused = true)]
async fn test_deadline_respects_finalized_message() {
    let transport = MemoryTransport::new();
    let task = signed("slow question");
    let relay = relay(&transport, Scripted::never(), |s| s.deadline_secs = 8);

    let runner = relay.clone();
    let run = tokio::spawn({
        let task = task.clone();
        async move { runner.process(task).await }
    });

    sleep(Duration::from_secs(5)).await;
    let update = CompletionUpdate {
        channel: task.channel.clone(),
        ts: task.ts.clone(),
        text: "answered in the browser".into(),
        prompt: task.prompt.clone(),
        sig: task.sig.clone(),
    };
    relay.complete(update).await.unwrap();

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, RelayOutcome::TimedOut { wrote_banner: false });
    assert_eq!(
        transport.text(&task.message()).as_deref(),
        Some("🤖 answered in the browser")
    );
}

/// A failed read does not suppress the timeout banner.
#[tokio::test(start_paused = true)]
async fn test_failed_read_still_writes_banner() {
    let transport = MemoryTransport::new();
    transport.set_fail_reads(true);
    let task = signed("anything");
    let relay = relay(&transport, Scripted::never(), |s| s.deadline_secs = 4);

    let outcome = relay.process(task.clone()).await.unwrap();
    assert_eq!(outcome, RelayOutcome::TimedOut { wrote_banner: true });
    assert!(transport
        .text(&task.message())
        .unwrap()
        .starts_with("⚠️ Response taking too long."));
}

/// Oversized answer: notice with the live link, reported as success.
#[tokio::test(start_paused = true)]
async fn test_oversized_answer_falls_back_to_link() {
    let transport = MemoryTransport::new().with_max_text_len(400);
    let task = signed("Explain everything");
    let relay = relay(&transport, Scripted::answer(3, &"lorem ipsum ".repeat(500)), |_| {});

    let outcome = relay.process(task.clone()).await.unwrap();
    assert_eq!(outcome, RelayOutcome::Answered(Delivery::Fallback));

    let text = transport.text(&task.message()).unwrap();
    assert!(text.starts_with("🤖 The answer is too long to show here."));
    assert!(text.contains(&relay.live_link(&task).anchor("👉 Click here to view the full answer")));
    assert!(transport
        .ops()
        .iter()
        .any(|op| matches!(op, TransportOp::Refused { reason, .. } if reason.contains("msg_too_long"))));
}

/// Generation error: one error banner carrying the live link.
#[tokio::test(start_paused = true)]
async fn test_generation_error_banner() {
    let transport = MemoryTransport::new();
    let task = signed("hello");
    let relay = relay(
        &transport,
        Scripted::fail(1, relay_core::GenerationError::NotConfigured("GEMINI_API_KEY".into())),
        |_| {},
    );

    let outcome = relay.process(task.clone()).await.unwrap();
    assert!(matches!(outcome, RelayOutcome::Failed { .. }));

    let text = transport.text(&task.message()).unwrap();
    assert!(text.starts_with("❌ Error: GEMINI_API_KEY not configured"));
    assert!(text.ends_with("|View Live Response>"));
}

/// Forged completion: Auth error, nothing written.
#[tokio::test]
async fn test_forged_completion_writes_nothing() {
    let transport = MemoryTransport::new();
    let relay = relay(&transport, Scripted::never(), |_| {});
    let task = signed("real prompt");

    let forged = CompletionUpdate {
        channel: task.channel.clone(),
        ts: task.ts.clone(),
        text: "injected".into(),
        prompt: "a different prompt".into(),
        sig: task.sig.clone(),
    };
    let err = relay.complete(forged).await.unwrap_err();
    assert!(matches!(err, RelayError::Auth));
    assert!(transport.ops().is_empty());
    assert_eq!(transport.text(&MessageRef::new("C042", "1718000000.000100")), None);
}

fn live_answer(task: &Task, text: &str) -> CompletionUpdate {
    CompletionUpdate {
        channel: task.channel.clone(),
        ts: task.ts.clone(),
        text: text.into(),
        prompt: task.prompt.clone(),
        sig: task.sig.clone(),
    }
}

/// Start `task` in the background, then complete it from the live view at 3s.
async fn complete_while_running(relay: &Relay, task: &Task) -> RelayOutcome {
    let run = tokio::spawn({
        let relay = relay.clone();
        let task = task.clone();
        async move { relay.process(task).await }
    });
    sleep(Duration::from_secs(3)).await;
    relay.complete(live_answer(task, "live answer")).await.unwrap();
    run.await.unwrap().unwrap()
}

/// A generation failure after a live-view completion leaves the answer alone.
#[tokio::test(start_paused = true)]
async fn test_live_completion_then_generation_failure() {
    let transport = MemoryTransport::new();
    let task = signed("question");
    let relay = relay(
        &transport,
        Scripted::fail(6, GenerationError::Backend("boom".into())),
        |_| {},
    );

    let outcome = complete_while_running(&relay, &task).await;
    assert_eq!(outcome, RelayOutcome::Superseded);
    assert_eq!(transport.text(&task.message()).as_deref(), Some("🤖 live answer"));
    assert!(!transport.writes().iter().any(|w| w.starts_with("❌")));
}

/// An in-time answer after a live-view completion is not written a second time.
#[tokio::test(start_paused = true)]
async fn test_live_completion_then_answer_in_time() {
    let transport = MemoryTransport::new();
    let task = signed("question");
    let relay = relay(&transport, Scripted::answer(6, "from the backend"), |_| {});

    let outcome = complete_while_running(&relay, &task).await;
    assert_eq!(outcome, RelayOutcome::Superseded);
    assert_eq!(answers(&transport), vec!["🤖 live answer"]);
    assert_eq!(relay.active_tasks(), 0);
}

fn hanging_relay(transport: &MemoryTransport, generator: Arc<Scripted>, deadline_secs: u64) -> Relay {
    let mut options = RelayOptions::default();
    options.settings.deadline_secs = deadline_secs;
    Relay::new(
        signer(),
        Arc::new(HangOnFrames(transport.clone())),
        generator,
        options,
    )
}

/// A progress frame stuck in the transport does not hold back the answer.
#[tokio::test(start_paused = true)]
async fn test_hung_frame_does_not_block_answer() {
    let transport = MemoryTransport::new();
    let task = signed("question");
    let relay = hanging_relay(&transport, Scripted::answer(3, "done"), 25);

    let outcome = timeout(Duration::from_secs(60), relay.process(task.clone()))
        .await
        .expect("terminal write held back by a hung frame")
        .unwrap();
    assert_eq!(outcome, RelayOutcome::Answered(Delivery::Direct));
    assert_eq!(transport.text(&task.message()).as_deref(), Some("🤖 done"));
}

/// Same for the timeout banner.
#[tokio::test(start_paused = true)]
async fn test_hung_frame_does_not_block_timeout_banner() {
    let transport = MemoryTransport::new();
    let task = signed("question");
    let relay = hanging_relay(&transport, Scripted::never(), 7);

    let outcome = timeout(Duration::from_secs(60), relay.process(task.clone()))
        .await
        .expect("terminal write held back by a hung frame")
        .unwrap();
    assert_eq!(outcome, RelayOutcome::TimedOut { wrote_banner: true });
    assert!(transport
        .text(&task.message())
        .unwrap()
        .starts_with("⚠️ Response taking too long."));
}

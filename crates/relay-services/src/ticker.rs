//! Progress ticker. Keeps a message visibly alive while generation runs.
//!
//! Once `cancel` returns, no further write is issued. A write already in
//! flight at that moment may still land. `stop` waits for it up to a grace
//! period and aborts it after that, so a hung frame never holds back the
//! caller's final write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relay_core::MessageRef;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::transport::ChatTransport;

/// Handle to a running ticker. Dropping it cancels the ticker.
pub struct TickerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    started_at: Instant,
    frames: Arc<AtomicU64>,
}

impl TickerHandle {
    /// Stop issuing writes. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token that cancels this ticker from elsewhere.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Frames written successfully so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Cancel and wait up to `grace` for the loop to exit. A loop still
    /// stuck in a write after that is aborted. Returns false if it was.
    pub async fn stop(mut self, grace: Duration) -> bool {
        self.token.cancel();
        let Some(mut task) = self.task.take() else {
            return true;
        };
        match tokio::time::timeout(grace, &mut task).await {
            Ok(_) => true,
            Err(_) => {
                task.abort();
                false
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start ticking `message` every `interval`. The first frame is written one
/// interval after start; `render` receives the time elapsed since start.
pub fn start<R>(
    transport: Arc<dyn ChatTransport>,
    message: MessageRef,
    interval: Duration,
    render: R,
) -> TickerHandle
where
    R: Fn(Duration) -> String + Send + 'static,
{
    let token = CancellationToken::new();
    let started_at = Instant::now();
    let frames = Arc::new(AtomicU64::new(0));

    let task = tokio::spawn(run(
        transport,
        message,
        interval,
        render,
        token.clone(),
        started_at,
        frames.clone(),
    ));

    TickerHandle {
        token,
        task: Some(task),
        started_at,
        frames,
    }
}

async fn run<R>(
    transport: Arc<dyn ChatTransport>,
    message: MessageRef,
    interval: Duration,
    render: R,
    token: CancellationToken,
    started_at: Instant,
    frames: Arc<AtomicU64>,
) where
    R: Fn(Duration) -> String,
{
    let mut ticks = tokio::time::interval_at(started_at + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let text = render(started_at.elapsed());
        match transport.update_message(&message, &text, None).await {
            Ok(()) => {
                frames.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(task = %message.short_id(), error = %e, "progress update failed");
            }
        }
    }

    tracing::debug!(
        task = %message.short_id(),
        frames = frames.load(Ordering::Relaxed),
        "ticker stopped"
    );
}

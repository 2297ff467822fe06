//! Relay integration test harness.
//!
//! Every test runs in-process against the in-memory chat transport. Timing
//! tests run on tokio's paused clock, so a 25s deadline costs no wall time.

mod api;
mod late;
mod scenarios;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::config::RelaySettings;
use relay_core::{DeliveryError, GenerationError, MessageRef, Signer, Task};
use relay_services::{Blocks, ChatTransport, Generator, MemoryTransport, Relay, RelayOptions};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const SECRET: &str = "integration-secret";

/// Generator that answers after a fixed delay, or never.
pub enum Scripted {
    After(Duration, Result<String, GenerationError>),
    Never,
}

impl Scripted {
    pub fn answer(secs: u64, text: &str) -> Arc<Self> {
        Arc::new(Self::After(Duration::from_secs(secs), Ok(text.to_string())))
    }

    pub fn fail(secs: u64, error: GenerationError) -> Arc<Self> {
        Arc::new(Self::After(Duration::from_secs(secs), Err(error)))
    }

    pub fn never() -> Arc<Self> {
        Arc::new(Self::Never)
    }
}

#[async_trait]
impl Generator for Scripted {
    async fn generate(&self, _: &str, _: Option<&str>) -> Result<String, GenerationError> {
        match self {
            Self::After(delay, reply) => {
                tokio::time::sleep(*delay).await;
                reply.clone()
            }
            Self::Never => std::future::pending().await,
        }
    }
}

/// Transport whose progress-frame writes never return. Everything else goes
/// through to the wrapped memory transport.
pub struct HangOnFrames(pub MemoryTransport);

#[async_trait]
impl ChatTransport for HangOnFrames {
    async fn update_message(
        &self,
        message: &MessageRef,
        text: &str,
        blocks: Option<&Blocks>,
    ) -> Result<(), DeliveryError> {
        if text.starts_with('⏳') && text.contains("`[") {
            std::future::pending::<()>().await;
        }
        self.0.update_message(message, text, blocks).await
    }

    async fn read_message(&self, message: &MessageRef) -> Result<Option<String>, DeliveryError> {
        self.0.read_message(message).await
    }
}

pub fn signer() -> Signer {
    Signer::new(SECRET).expect("non-empty secret")
}

pub fn signed(prompt: &str) -> Task {
    signer().sign_task(prompt, "C042", "1718000000.000100")
}

/// Relay over `transport` with default settings adjusted by `tweak`.
pub fn relay(
    transport: &MemoryTransport,
    generator: Arc<dyn Generator>,
    tweak: impl FnOnce(&mut RelaySettings),
) -> Relay {
    let mut options = RelayOptions::default();
    tweak(&mut options.settings);
    Relay::new(signer(), Arc::new(transport.clone()), generator, options)
}

/// Writes that carry a delivered answer or notice.
pub fn answers(transport: &MemoryTransport) -> Vec<String> {
    transport
        .writes()
        .into_iter()
        .filter(|w| w.starts_with("🤖"))
        .collect()
}

//! Chat transport trait, the relay's only path to the chat platform.
//!
//! The platform offers plain overwrite-by-identifier semantics: the last
//! write wins, and there is no conditional update. Callers that must not
//! clobber a finished message read it first (see `detector`).

use async_trait::async_trait;
use relay_core::{DeliveryError, MessageRef};

/// Structured content sent alongside the text (Slack Block Kit JSON).
pub type Blocks = serde_json::Value;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Overwrite the message at `message` with `text` and optional blocks.
    ///
    /// Fails with `DeliveryError::PayloadTooLarge` when the platform refuses
    /// the size of the text or of the blocks.
    async fn update_message(
        &self,
        message: &MessageRef,
        text: &str,
        blocks: Option<&Blocks>,
    ) -> Result<(), DeliveryError>;

    /// Current text of the message, or `None` if the slot holds no message.
    async fn read_message(&self, message: &MessageRef) -> Result<Option<String>, DeliveryError>;
}

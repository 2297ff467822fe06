//! Completion detector: read before a fallback write so it never clobbers a
//! message that already shows a final answer.

use std::sync::Arc;

use relay_core::{classify, MessageRef, MessageState};

use crate::transport::ChatTransport;

#[derive(Clone)]
pub struct CompletionDetector {
    transport: Arc<dyn ChatTransport>,
}

impl CompletionDetector {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// True only when the message's current text classifies as finalized.
    ///
    /// Read failures and missing messages count as not finalized, so the
    /// fallback write still happens.
    pub async fn is_already_finalized(&self, message: &MessageRef) -> bool {
        match self.transport.read_message(message).await {
            Ok(Some(text)) => classify(&text) == MessageState::Finalized,
            Ok(None) => {
                tracing::debug!(task = %message.short_id(), "message not found on read");
                false
            }
            Err(e) => {
                tracing::warn!(task = %message.short_id(), error = %e, "message read failed");
                false
            }
        }
    }
}

//! In-memory chat transport, used when no bot token is configured and in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{DeliveryError, MessageRef};

use crate::transport::{Blocks, ChatTransport};

/// One call observed by the in-memory transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Read(MessageRef),
    Write {
        message: MessageRef,
        text: String,
        with_blocks: bool,
    },
    /// A write that returned an error and changed nothing.
    Refused { message: MessageRef, reason: String },
}

/// In-memory chat transport.
///
/// Used by relayd when no bot token is configured and by tests that need to
/// see exactly what the relay wrote, and in which order it read and wrote.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    /// Current text per message slot.
    messages: Arc<DashMap<MessageRef, String>>,
    ops: Arc<Mutex<Vec<TransportOp>>>,
    max_text_len: Option<usize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse texts longer than `max` chars as too large.
    pub fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = Some(max);
        self
    }

    /// Place a message without recording an op, as the trigger source would.
    pub fn post(&self, message: MessageRef, text: impl Into<String>) {
        self.messages.insert(message, text.into());
    }

    /// Current text of a message.
    pub fn text(&self, message: &MessageRef) -> Option<String> {
        self.messages.get(message).map(|t| t.clone())
    }

    /// Every op so far.
    pub fn ops(&self) -> Vec<TransportOp> {
        self.log().clone()
    }

    /// Texts of successful writes, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|op| match op {
                TransportOp::Write { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn log(&self) -> MutexGuard<'_, Vec<TransportOp>> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refuse(&self, message: &MessageRef, error: DeliveryError) -> Result<(), DeliveryError> {
        self.log().push(TransportOp::Refused {
            message: message.clone(),
            reason: error.to_string(),
        });
        Err(error)
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn update_message(
        &self,
        message: &MessageRef,
        text: &str,
        blocks: Option<&Blocks>,
    ) -> Result<(), DeliveryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return self.refuse(message, DeliveryError::Other("write refused".into()));
        }
        if let Some(max) = self.max_text_len {
            if text.chars().count() > max {
                return self.refuse(message, DeliveryError::PayloadTooLarge("msg_too_long".into()));
            }
        }
        tracing::debug!(
            channel = %message.channel,
            ts = %message.ts,
            len = text.len(),
            "memory transport write"
        );
        self.messages.insert(message.clone(), text.to_string());
        self.log().push(TransportOp::Write {
            message: message.clone(),
            text: text.to_string(),
            with_blocks: blocks.is_some(),
        });
        Ok(())
    }

    async fn read_message(&self, message: &MessageRef) -> Result<Option<String>, DeliveryError> {
        self.log().push(TransportOp::Read(message.clone()));
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DeliveryError::Other("read refused".into()));
        }
        Ok(self.text(message))
    }
}

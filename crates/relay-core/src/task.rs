//! Task and message identity types.
//!
//! A `Task` arrives from the trigger source carrying its own signature. It is
//! inert until `Signer::verify_task` turns it into a `VerifiedTask`; the relay
//! only ever acts on the verified form.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Reference to one chat message: channel plus platform-assigned timestamp.
///
/// The timestamp doubles as the message's identity slot; two writers holding
/// the same `MessageRef` are writing to the same message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }

    /// BLAKE3 identity of the message slot.
    pub fn task_id(&self) -> [u8; 32] {
        crate::crypto::task_id(&self.channel, &self.ts)
    }

    /// First 16 hex chars of `task_id`, for logs and API responses.
    pub fn short_id(&self) -> String {
        hex::encode(&self.task_id()[..8])
    }
}

/// A signed unit of relayed generation work.
///
/// Missing fields deserialize as empty strings so `validate` can name them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub prompt: String,
    pub channel: String,
    pub ts: String,
    pub sig: String,
}

impl Task {
    pub fn message(&self) -> MessageRef {
        MessageRef::new(&self.channel, &self.ts)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("prompt", &self.prompt),
            ("channel", &self.channel),
            ("ts", &self.ts),
            ("sig", &self.sig),
        ])
    }
}

/// A task whose signature has been checked against the shared secret.
///
/// Only `Signer::verify_task` can build one.
#[derive(Debug, Clone)]
pub struct VerifiedTask {
    task: Task,
}

impl VerifiedTask {
    pub(crate) fn new(task: Task) -> Self {
        Self { task }
    }

    pub fn prompt(&self) -> &str {
        &self.task.prompt
    }

    pub fn signature(&self) -> &str {
        &self.task.sig
    }

    pub fn message(&self) -> MessageRef {
        self.task.message()
    }

    pub fn task(&self) -> &Task {
        &self.task
    }
}

/// A finished answer pushed by the live-view path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionUpdate {
    pub channel: String,
    pub ts: String,
    pub text: String,
    pub prompt: String,
    pub sig: String,
}

impl CompletionUpdate {
    pub fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("channel", &self.channel),
            ("ts", &self.ts),
            ("text", &self.text),
            ("prompt", &self.prompt),
            ("sig", &self.sig),
        ])
    }

    /// The task this update claims to complete. Verified like any other task.
    pub fn task(&self) -> Task {
        Task {
            prompt: self.prompt.clone(),
            channel: self.channel.clone(),
            ts: self.ts.clone(),
            sig: self.sig.clone(),
        }
    }
}

fn require(fields: &[(&str, &String)]) -> Result<(), RelayError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RelayError::Validation(format!(
            "missing required parameters: {}",
            missing.join(", ")
        )))
    }
}

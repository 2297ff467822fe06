//! Active-task table: one running task per message slot.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_core::MessageRef;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one relayed task.
///
///   Pending → InProgress → {Succeeded | Failed | TimedOut} → Delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    TimedOut,
    Delivered,
}

struct Slot {
    state: RelayState,
    ticker: Option<CancellationToken>,
    /// Set once another path has written the final answer.
    completed: bool,
}

#[derive(Clone, Default)]
pub struct TaskTable {
    slots: Arc<DashMap<[u8; 32], Slot>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `message`. `None` if a task already holds it.
    pub fn claim(&self, message: &MessageRef) -> Option<Claim> {
        let id = message.task_id();
        match self.slots.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => {
                v.insert(Slot {
                    state: RelayState::Pending,
                    ticker: None,
                    completed: false,
                });
                Some(Claim {
                    table: self.clone(),
                    id,
                })
            }
        }
    }

    pub fn state(&self, message: &MessageRef) -> Option<RelayState> {
        self.slots.get(&message.task_id()).map(|s| s.state)
    }

    /// Cancel the ticker of the task holding `message`, if one is running.
    pub fn stop_ticker(&self, message: &MessageRef) -> bool {
        self.slots
            .get(&message.task_id())
            .and_then(|s| s.ticker.clone())
            .map(|token| token.cancel())
            .is_some()
    }

    /// Record that the message of an active task now holds its final
    /// answer. The task's own terminal writes are skipped from then on.
    pub fn mark_completed(&self, message: &MessageRef) -> bool {
        match self.slots.get_mut(&message.task_id()) {
            Some(mut slot) => {
                slot.completed = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Exclusive hold on a message slot. Released on drop.
pub struct Claim {
    table: TaskTable,
    id: [u8; 32],
}

impl Claim {
    pub fn set(&self, state: RelayState) {
        if let Some(mut slot) = self.table.slots.get_mut(&self.id) {
            slot.state = state;
        }
    }

    /// Whether another path finalized the message while this claim was held.
    pub fn completed_elsewhere(&self) -> bool {
        self.table
            .slots
            .get(&self.id)
            .is_some_and(|slot| slot.completed)
    }

    pub fn attach_ticker(&self, token: CancellationToken) {
        if let Some(mut slot) = self.table.slots.get_mut(&self.id) {
            slot.ticker = Some(token);
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.table.slots.remove(&self.id);
    }
}

//! Recent-events ring buffer behind `GET /api/events`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::time::Instant;

/// Event kinds.
pub mod kinds {
    pub const TASK_ACCEPTED: &str = "task_accepted";
    pub const TASK_REJECTED: &str = "task_rejected";
    pub const TASK_FINISHED: &str = "task_finished";
    pub const LATE_ANSWER: &str = "late_answer";
    pub const COMPLETION: &str = "completion";
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayEvent {
    /// Unix milliseconds.
    pub timestamp: u64,
    pub kind: &'static str,
    pub payload: serde_json::Value,
}

struct Entry {
    at: Instant,
    event: RelayEvent,
}

/// Bounded, newest-first event log. Capacity 0 disables recording.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<Mutex<VecDeque<Entry>>>,
    capacity: usize,
    max_age: Option<Duration>,
}

impl EventLog {
    pub fn new(capacity: usize, max_age: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            max_age,
        }
    }

    pub fn append(&self, kind: &'static str, payload: serde_json::Value) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        entries.push_front(Entry {
            at: Instant::now(),
            event: RelayEvent {
                timestamp: now_ms(),
                kind,
                payload,
            },
        });
        entries.truncate(self.capacity);
        self.evict_aged(&mut entries);
    }

    /// Live events, newest first.
    pub fn recent(&self) -> Vec<RelayEvent> {
        let mut entries = self.lock();
        self.evict_aged(&mut entries);
        entries.iter().map(|e| e.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        self.evict_aged(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of the newest live event.
    pub fn last_activity(&self) -> Option<u64> {
        let mut entries = self.lock();
        self.evict_aged(&mut entries);
        entries.front().map(|e| e.event.timestamp)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_aged(&self, entries: &mut VecDeque<Entry>) {
        let Some(max_age) = self.max_age else { return };
        while entries.back().is_some_and(|e| e.at.elapsed() > max_age) {
            entries.pop_back();
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

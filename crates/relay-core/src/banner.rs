//! Rendered chat text: progress frames, terminal banners, and the
//! classification used to tell an in-progress message from a finished one.
//!
//! Every banner the relay writes while an answer is still pending carries one
//! of `PENDING_PATTERNS`; every banner that delivers an answer carries
//! `SUCCESS_MARKER`. `classify` relies on exactly that split.

use std::time::Duration;

use crate::link::LiveLink;

/// Prefix of every delivered answer.
pub const SUCCESS_MARKER: &str = "🤖";

/// Substrings that mark a message as still awaiting its answer. The first two
/// come from the trigger source's placeholder ("⏳ Asking AI...", "Thinking...").
const PENDING_PATTERNS: &[&str] = &["Asking AI", "Thinking", PENDING_MARKER, TIMEOUT_MARKER];

const PENDING_MARKER: &str = "⏳";
const TIMEOUT_MARKER: &str = "Response taking too long";

/// Ordered stage labels shown while generation runs.
pub const STAGES: &[&str] = &[
    "Connecting to Gemini...",
    "Authenticating...",
    "Sending prompt...",
    "Analyzing context...",
    "Generating response...",
    "Formatting output...",
];

const FILLED: char = '█';
const EMPTY: char = '░';

const LIVE_LABEL: &str = "View Live Response";

// ── Progress ──────────────────────────────────────────────────────────────────

/// Shape of the progress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStyle {
    /// Number of segments in the bar.
    pub bar_width: usize,
    /// Time spent on each stage label before moving to the next.
    pub stage_duration: Duration,
}

impl Default for ProgressStyle {
    fn default() -> Self {
        Self {
            bar_width: 10,
            stage_duration: Duration::from_millis(1500),
        }
    }
}

/// `min(secs, width)` filled segments, padded with empty ones to `width`.
pub fn progress_bar(elapsed_secs: u64, width: usize) -> String {
    let filled = (elapsed_secs.min(width as u64)) as usize;
    let mut bar = String::with_capacity(width * FILLED.len_utf8());
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(width - filled));
    bar
}

/// Stage label for an elapsed time, capped at the last label.
pub fn stage_label(elapsed: Duration, stage_duration: Duration) -> &'static str {
    let index = if stage_duration.is_zero() {
        STAGES.len() - 1
    } else {
        (elapsed.as_millis() / stage_duration.as_millis()) as usize
    };
    STAGES[index.min(STAGES.len() - 1)]
}

/// One ticker frame.
pub fn progress_frame(elapsed: Duration, style: &ProgressStyle, link: &LiveLink) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{PENDING_MARKER} *{}*\n`[{}] {}s`\n{}",
        stage_label(elapsed, style.stage_duration),
        progress_bar(secs, style.bar_width),
        secs,
        link.anchor(LIVE_LABEL),
    )
}

// ── Banners ───────────────────────────────────────────────────────────────────

/// First write after a task is picked up.
pub fn starting(link: &LiveLink) -> String {
    format!(
        "{PENDING_MARKER} *Starting AI Engine...*\n{}",
        link.anchor(LIVE_LABEL)
    )
}

/// The delivered answer, already converted to chat markup.
pub fn success(text: &str) -> String {
    format!("{SUCCESS_MARKER} {text}")
}

/// Written when the deadline wins the race.
pub fn timed_out(link: &LiveLink) -> String {
    format!(
        "⚠️ {TIMEOUT_MARKER}.\n{}",
        link.anchor("👉 Click here to view the answer")
    )
}

/// Written when generation or delivery fails.
pub fn failed(error: &str, link: &LiveLink) -> String {
    format!(
        "❌ Error: {error}\nTry the live link: {}",
        link.anchor(LIVE_LABEL)
    )
}

/// Short notice replacing an answer the transport refused as too large.
pub fn oversized(link: &LiveLink) -> String {
    format!(
        "{SUCCESS_MARKER} The answer is too long to show here.\n{}",
        link.anchor("👉 Click here to view the full answer")
    )
}

// ── Classification ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Shows a placeholder, a progress frame, or the timeout notice.
    Pending,
    /// Shows an answer, an error, or anything the relay did not write.
    Finalized,
}

/// Classify the current text of a message.
///
/// The success marker always wins. Empty text counts as pending so a blank
/// read never suppresses a write.
pub fn classify(text: &str) -> MessageState {
    if text.contains(SUCCESS_MARKER) {
        return MessageState::Finalized;
    }
    if text.trim().is_empty() || PENDING_PATTERNS.iter().any(|p| text.contains(p)) {
        MessageState::Pending
    } else {
        MessageState::Finalized
    }
}

//! Deadline race for a single generation call.

use std::future::Future;
use std::time::Duration;

/// Result of racing a call against a deadline.
#[derive(Debug, PartialEq, Eq)]
pub enum RaceOutcome<T> {
    Completed(T),
    TimedOut,
}

/// Race `call` against `deadline`.
///
/// The call is borrowed, not consumed: when the deadline wins the call is left
/// untouched and the caller may keep awaiting it. If both are ready in the
/// same poll, the call wins.
pub async fn race_with_deadline<F>(call: &mut F, deadline: Duration) -> RaceOutcome<F::Output>
where
    F: Future + Unpin,
{
    tokio::select! {
        biased;
        value = call => RaceOutcome::Completed(value),
        _ = tokio::time::sleep(deadline) => RaceOutcome::TimedOut,
    }
}

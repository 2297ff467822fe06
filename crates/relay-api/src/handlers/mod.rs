//! HTTP API handlers for task intake, completions and relay state as JSON.

pub mod generate;
pub mod process;
pub mod status;
pub mod update;

use axum::http::StatusCode;

use relay_core::{DeliveryError, RelayError};
use relay_services::Relay;

#[derive(Clone)]
pub struct ApiState {
    pub relay: Relay,
    /// Daemon start, for uptime in `/status`.
    pub started_at: std::time::Instant,
}

impl ApiState {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay,
            started_at: std::time::Instant::now(),
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Map a relay error onto a status code and plain-text body.
fn reject(err: RelayError) -> (StatusCode, String) {
    let status = match &err {
        RelayError::Auth => StatusCode::FORBIDDEN,
        RelayError::Validation(_) => StatusCode::BAD_REQUEST,
        RelayError::AlreadyRunning => StatusCode::CONFLICT,
        RelayError::Delivery(DeliveryError::NotFound | DeliveryError::Other(_)) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

// Re-export handler functions for use in router setup.
pub use generate::handle_generate;
pub use process::handle_process;
pub use status::{handle_events, handle_status};
pub use update::handle_update;

//! /status and /events handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use relay_services::RelayEvent;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_tasks: usize,
    pub events_recorded: usize,
    /// Unix ms of the newest recorded event.
    pub last_activity: Option<u64>,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let events = state.relay.events();
    Json(StatusResponse {
        status: "running",
        uptime_secs: state.started_at.elapsed().as_secs(),
        active_tasks: state.relay.active_tasks(),
        events_recorded: events.len(),
        last_activity: events.last_activity(),
    })
}

// ── /events ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<RelayEvent>,
}

pub async fn handle_events(State(state): State<ApiState>) -> Json<EventsResponse> {
    Json(EventsResponse {
        events: state.relay.events().recent(),
    })
}

//! /process handler: accepts a signed task and runs it in the background.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use relay_core::Task;

use super::{reject, ApiState};

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub accepted: bool,
    pub task_id: String,
}

pub async fn handle_process(
    State(state): State<ApiState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<ProcessResponse>), (StatusCode, String)> {
    let task_id = state.relay.submit(task).map_err(reject)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            accepted: true,
            task_id,
        }),
    ))
}

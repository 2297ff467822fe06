//! /update handler: the live view pushes a finished answer back.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use relay_core::CompletionUpdate;
use relay_services::Delivery;

use super::{reject, ApiState};

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub delivery: Delivery,
}

pub async fn handle_update(
    State(state): State<ApiState>,
    Json(update): Json<CompletionUpdate>,
) -> Result<Json<UpdateResponse>, (StatusCode, String)> {
    let delivery = state.relay.complete(update).await.map_err(reject)?;
    Ok(Json(UpdateResponse {
        success: true,
        delivery,
    }))
}

//! /ai handler: one-off generation with no chat message behind it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{reject, ApiState};

/// `prompt` wins; `message` is accepted for older clients.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub response: String,
    pub model: String,
}

pub async fn handle_generate(
    State(state): State<ApiState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, (StatusCode, String)> {
    let prompt = [req.prompt, req.message]
        .into_iter()
        .find(|p| !p.trim().is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "prompt or message is required".to_string(),
            )
        })?;

    let response = state
        .relay
        .ask(&prompt)
        .await
        .map_err(|e| reject(e.into()))?;
    Ok(Json(GenerateResponse {
        success: true,
        response,
        model: state.relay.model().to_string(),
    }))
}

//! Turn feedback HTTP handler.
//!
//! POST /api/v1/turns/{id}/feedback - Set or clear like/dislike on a
//! turn. Sending `null` clears existing feedback.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use querydesk_types::turn::Feedback;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for turn feedback. `{"feedback": null}` clears.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Option<Feedback>,
}

/// POST /api/v1/turns/{id}/feedback - Record feedback on a turn.
pub async fn set_feedback(
    State(state): State<AppState>,
    Path(turn_id): Path<String>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let tid = turn_id
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {turn_id}")))?;

    state.sessions.set_feedback(&tid, body.feedback).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"turn_id": tid, "feedback": body.feedback}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

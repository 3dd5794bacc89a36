//! Session CRUD HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions              - Create a session
//! - GET    /api/v1/sessions?user_id=     - List a user's sessions
//! - GET    /api/v1/sessions/{id}/history - Ordered turn history
//! - PATCH  /api/v1/sessions/{id}/title   - Rename a session
//! - DELETE /api/v1/sessions/{id}         - Delete a session and its turns

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use querydesk_types::turn::{ChatSession, Turn};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for session creation.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    /// Defaults to "New Chat"; replaced by an auto-derived title after
    /// the first exchange.
    pub title: Option<String>,
}

/// Query parameters for session listing.
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub user_id: String,
}

/// Query parameters for history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Request body for renaming a session.
#[derive(Debug, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListData {
    pub sessions: Vec<ChatSession>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub session_id: Uuid,
    pub turns: Vec<Turn>,
    pub total_count: u32,
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid
/// format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// POST /api/v1/sessions - Create a session.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<ApiResponse<ChatSession>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }

    let session = state
        .sessions
        .create_session(body.user_id.trim(), body.title)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let self_link = format!("/api/v1/sessions/{}", session.id);
    let history_link = format!("/api/v1/sessions/{}/history", session.id);
    let resp = ApiResponse::success(session, request_id, elapsed)
        .with_link("self", &self_link)
        .with_link("history", &history_link);

    Ok(Json(resp))
}

/// GET /api/v1/sessions?user_id= - List a user's sessions, most recently
/// updated first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<ApiResponse<SessionListData>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sessions = state.sessions.list_sessions(&query.user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let data = SessionListData {
        total_count: sessions.len(),
        sessions,
    };
    let resp = ApiResponse::success(data, request_id, elapsed).with_link(
        "self",
        &format!("/api/v1/sessions?user_id={}", query.user_id),
    );

    Ok(Json(resp))
}

/// GET /api/v1/sessions/{id}/history - Ordered turn history plus total
/// count.
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryData>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    state
        .sessions
        .get_session(&sid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {sid} not found")))?;

    let turns = state.sessions.get_history(&sid, Some(query.limit)).await?;
    let total_count = state.sessions.count_turns(&sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let data = HistoryData {
        session_id: sid,
        turns,
        total_count,
    };
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{sid}/history"))
        .with_link("session", &format!("/api/v1/sessions/{sid}"));

    Ok(Json(resp))
}

/// PATCH /api/v1/sessions/{id}/title - Rename a session. 404 when the
/// session does not exist.
pub async fn update_title(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }

    state.sessions.update_title(&sid, title).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"session_id": sid, "title": title}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// DELETE /api/v1/sessions/{id} - Delete a session; cascades to turns.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let messages_deleted = state.sessions.delete_session(&sid).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"deleted": true, "messages_deleted": messages_deleted}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

//! SSE streaming chat endpoint.
//!
//! POST /api/v1/chat/stream
//!
//! Hands the message to the session orchestrator and relays its ordered
//! progress events as Server-Sent Events. Each SSE event is named after
//! the progress event's type and carries the full [`ProgressEvent`] as
//! JSON; the stream ends after the terminal `final_response` (or
//! `error`) event.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;
use uuid::Uuid;

use querydesk_core::orchestrator::ChatRequest;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for the streaming chat endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamChatRequest {
    /// The user message to process.
    pub message: String,
    pub user_id: String,
    /// Existing session to continue; if absent, a new session is
    /// created implicitly.
    pub session_id: Option<String>,
}

/// POST /api/v1/chat/stream - SSE streaming chat.
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<StreamChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }

    // Resolve or create the session before any streaming starts, so a
    // bad session id fails as a plain 4xx rather than mid-stream.
    let session_id = match &body.session_id {
        Some(sid) => {
            let sid = sid
                .parse::<Uuid>()
                .map_err(|_| AppError::Validation("Invalid session_id format".to_string()))?;
            state
                .sessions
                .get_session(&sid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Session {sid} not found")))?
                .id
        }
        None => {
            state
                .sessions
                .create_session(body.user_id.trim(), None)
                .await?
                .id
        }
    };

    let request = ChatRequest {
        message: body.message,
        session_id,
        user_id: Some(body.user_id),
    };

    let events = state.orchestrator.handle_message(request);
    let sse_stream = events.map(|event| {
        let name = event.event_type.to_string();
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, Infallible>(Event::default().event(name).data(data))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

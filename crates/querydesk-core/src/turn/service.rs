//! Session lifecycle service.
//!
//! SessionService wraps the TurnRepository for the HTTP surface:
//! creating, listing, renaming, and deleting sessions, reading history,
//! and recording turn feedback. Generic over the repository so this
//! crate never depends on querydesk-infra.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use querydesk_types::error::RepositoryError;
use querydesk_types::turn::{ChatSession, Feedback, Turn};

use crate::turn::repository::TurnRepository;

/// Default title given to sessions until the first exchange names them.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Maximum characters kept when deriving a title from a first message.
const TITLE_MAX_CHARS: usize = 60;

/// Orchestrates session lifecycle over a [`TurnRepository`].
pub struct SessionService<T: TurnRepository> {
    repo: T,
}

impl<T: TurnRepository> SessionService<T> {
    pub fn new(repo: T) -> Self {
        Self { repo }
    }

    /// Create a session for a user, defaulting the title.
    pub async fn create_session(
        &self,
        user_id: &str,
        title: Option<String>,
    ) -> Result<ChatSession, RepositoryError> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            title: title.unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string()),
            created_at: now,
            updated_at: now,
            message_count: 0,
        };
        let created = self.repo.create_session(&session).await?;
        info!(session_id = %created.id, user_id, "session created");
        Ok(created)
    }

    pub async fn get_session(
        &self,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        self.repo.get_session(session_id).await
    }

    /// List a user's sessions, most recently updated first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        self.repo.list_sessions(user_id).await
    }

    /// Ordered history for a session, capped to the most recent `limit`.
    pub async fn get_history(
        &self,
        session_id: &Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        self.repo.get_turns(session_id, limit).await
    }

    pub async fn count_turns(&self, session_id: &Uuid) -> Result<u32, RepositoryError> {
        self.repo.count_turns(session_id).await
    }

    /// Rename a session.
    pub async fn update_title(
        &self,
        session_id: &Uuid,
        title: &str,
    ) -> Result<(), RepositoryError> {
        self.repo.update_session_title(session_id, title).await?;
        info!(session_id = %session_id, "session title updated");
        Ok(())
    }

    /// Delete a session and its turns; returns the turn count removed.
    pub async fn delete_session(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        let deleted = self.repo.delete_session(session_id).await?;
        info!(session_id = %session_id, turns_deleted = deleted, "session deleted");
        Ok(deleted)
    }

    /// Set or clear like/dislike feedback on a turn.
    pub async fn set_feedback(
        &self,
        turn_id: &Uuid,
        feedback: Option<Feedback>,
    ) -> Result<(), RepositoryError> {
        match self.repo.set_feedback(turn_id, feedback).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => {
                warn!(turn_id = %turn_id, "feedback for non-existent turn");
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(e),
        }
    }
}

/// Derive a session title from the first user message.
///
/// Takes the first line, word-truncated to [`TITLE_MAX_CHARS`].
pub fn derive_title(message: &str) -> String {
    let first_line = message.trim().lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return DEFAULT_SESSION_TITLE.to_string();
    }
    if first_line.chars().count() <= TITLE_MAX_CHARS {
        return first_line.to_string();
    }
    let mut end = 0;
    for (count, (idx, ch)) in first_line.char_indices().enumerate() {
        if count >= TITLE_MAX_CHARS {
            break;
        }
        end = idx + ch.len_utf8();
    }
    let truncated = &first_line[..end];
    let cut = truncated.rfind(char::is_whitespace).unwrap_or(end);
    format!("{}...", truncated[..cut].trim_end())
}

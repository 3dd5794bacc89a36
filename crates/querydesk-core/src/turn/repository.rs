//! TurnRepository trait definition.
//!
//! Append/read access to sessions and their turns. Append is the sole
//! mutation of conversation state: turns are never updated in place
//! (feedback is user metadata, not conversation state), so per-session
//! ordering is guaranteed by append order.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use querydesk_types::error::RepositoryError;
use querydesk_types::turn::{ChatSession, Feedback, Turn};
use uuid::Uuid;

/// Repository trait for session and turn persistence.
///
/// Implementations live in querydesk-infra (e.g., `SqliteTurnRepository`).
pub trait TurnRepository: Send + Sync {
    /// Create a new session.
    fn create_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// List a user's sessions, most recently updated first.
    fn list_sessions(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Rename a session. Fails with `NotFound` when absent.
    fn update_session_title(
        &self,
        session_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Bump a session's `updated_at` to now.
    fn touch_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session and cascade its turns. Returns the number of
    /// turns deleted. Fails with `NotFound` when absent.
    fn delete_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Append a turn to its session and increment the message count.
    fn append_turn(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session's turns in append order (oldest first), optionally
    /// capped to the most recent `limit`.
    fn get_turns(
        &self,
        session_id: &Uuid,
        limit: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Total number of turns in a session.
    fn count_turns(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// Set or clear like/dislike feedback on a turn. Fails with
    /// `NotFound` when the turn does not exist.
    fn set_feedback(
        &self,
        turn_id: &Uuid,
        feedback: Option<Feedback>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

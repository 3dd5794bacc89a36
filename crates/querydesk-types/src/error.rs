use thiserror::Error;

use crate::generation::GenerationError;

/// Errors from repository operations (used by trait definitions in
/// querydesk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors raised while handling a chat message.
///
/// Nothing here is fatal to the process: every failure is scoped to the
/// single request and surfaced as a terminal `error` event. Ambiguous
/// confirmation replies are not errors at all; they resolve to
/// `ConfirmationOutcome::NeedsRephrase`.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Empty or malformed request, rejected before any classification.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The generation capability failed or returned unparseable output
    /// during routing.
    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(String),

    /// Generated SQL failed the read-only/allowlist/user-scope check.
    /// Raised before execution, never by the database.
    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(String),

    /// A backing store was unavailable mid-branch.
    #[error("retrieval failure: {0}")]
    RetrievalFailure(String),

    /// Generation failed inside a branch pipeline (post-routing).
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Turn or session persistence failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ChatError {
    /// A user-safe message for the terminal `error` event.
    ///
    /// Raw failure detail stays in logs; it is neither streamed to the
    /// client nor persisted to the assistant turn.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::InvalidInput(msg) => msg.clone(),
            ChatError::ClassificationUnavailable(_) => {
                "I couldn't process your message right now. Please try again.".to_string()
            }
            ChatError::UnsafeQuery(_) => {
                "I can only answer read-only questions about your own data, so I \
                 couldn't run that one."
                    .to_string()
            }
            ChatError::RetrievalFailure(_) => {
                "The data source is temporarily unavailable. Please try again shortly.".to_string()
            }
            ChatError::Generation(_) => {
                "I couldn't generate a response right now. Please try again.".to_string()
            }
            ChatError::Repository(_) => {
                "Something went wrong saving this conversation. Please try again.".to_string()
            }
        }
    }
}

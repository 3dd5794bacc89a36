//! Conversation session and turn types.
//!
//! A session is an append-only ordered sequence of turns. Turns are
//! immutable once written; the only shared mutation in the system is
//! appending a new turn, so ordering within a session is guaranteed by
//! append order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::route::QueryType;

/// Role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// User feedback on an assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Like => write!(f, "like"),
            Feedback::Dislike => write!(f, "dislike"),
        }
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Feedback::Like),
            "dislike" => Ok(Feedback::Dislike),
            other => Err(format!("invalid feedback: '{other}'")),
        }
    }
}

/// A grammatical correction awaiting user confirmation.
///
/// Carried as the payload of the assistant turn that asked for
/// confirmation. It has no existence independent of that turn: only the
/// immediately following user turn may resolve it, and once resolved (any
/// outcome) it is never presented again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteProposal {
    /// The query exactly as the user typed it.
    pub original_query: String,
    /// The corrected form awaiting confirmation.
    pub rewritten_query: String,
    /// Short human-readable explanation of the correction.
    pub reason: String,
}

/// Machine-readable annotation attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnPayload {
    /// A rewrite was proposed and awaits the next user turn.
    RewriteProposal(RewriteProposal),
    /// Records which route produced this assistant turn.
    Route { query_type: QueryType },
}

impl TurnPayload {
    /// The pending proposal, if this payload carries one.
    pub fn as_proposal(&self) -> Option<&RewriteProposal> {
        match self {
            TurnPayload::RewriteProposal(p) => Some(p),
            TurnPayload::Route { .. } => None,
        }
    }
}

/// One message in a session's ordered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: TurnRole,
    pub content: String,
    /// Optional machine-readable annotation (pending proposal, route tag).
    pub payload: Option<TurnPayload>,
    /// Like/dislike set by the user after the fact.
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// The live rewrite proposal on this turn, if any.
    ///
    /// Only meaningful when this turn is the immediately preceding
    /// assistant turn; older proposals are treated as abandoned.
    pub fn pending_proposal(&self) -> Option<&RewriteProposal> {
        if self.role != TurnRole::Assistant {
            return None;
        }
        self.payload.as_ref().and_then(TurnPayload::as_proposal)
    }
}

/// A chat session owned by a user.
///
/// Sessions exclusively own their turns: deleting a session deletes all
/// of its turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u32,
}

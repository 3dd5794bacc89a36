//! Progress events and final response payloads.
//!
//! Each request produces an ordered stream of progress events ending in
//! exactly one terminal event (`final_response` or `error`). Events are
//! observational: callers must not rely on them for control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::route::CustomerCategory;

/// Kind of progress event emitted while processing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// General progress notice.
    Status,
    /// Classifying the message into a handling path.
    Routing,
    /// Generating a SQL statement from the question.
    SqlGenerating,
    /// Checking the generated statement against the safety rules.
    SqlValidating,
    /// Running the validated statement.
    SqlExecuting,
    /// Turning raw rows into a natural-language answer.
    Formatting,
    /// Retrieving candidate documents.
    Searching,
    /// Scoring and filtering retrieved documents.
    Ranking,
    /// Composing an answer from the top-ranked documents.
    Synthesizing,
    /// Categorizing a customer-service inquiry.
    Categorizing,
    /// Producing the templated customer-service response.
    Responding,
    /// Terminal event carrying the structured response.
    FinalResponse,
    /// Terminal event carrying a user-safe failure message.
    Error,
}

impl EventType {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventType::FinalResponse | EventType::Error)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Status => "status",
            EventType::Routing => "routing",
            EventType::SqlGenerating => "sql_generating",
            EventType::SqlValidating => "sql_validating",
            EventType::SqlExecuting => "sql_executing",
            EventType::Formatting => "formatting",
            EventType::Searching => "searching",
            EventType::Ranking => "ranking",
            EventType::Synthesizing => "synthesizing",
            EventType::Categorizing => "categorizing",
            EventType::Responding => "responding",
            EventType::FinalResponse => "final_response",
            EventType::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One event in a request's progress stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event_type: EventType,
    /// Human-readable text for progress events; a JSON object (serialized
    /// [`FinalResponse`]) for `final_response`.
    pub data: String,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(event_type: EventType, data: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            event_type,
            data: data.into(),
            session_id,
            timestamp: Utc::now(),
        }
    }
}

/// A document returned by the search branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub document_id: Uuid,
    pub title: String,
    pub snippet: String,
    pub relevance_score: f32,
}

/// The structured payload of the terminal `final_response` event.
///
/// The wire shape depends on the route that handled the message; the
/// variants here are exhaustive over [`crate::route::QueryType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "query_type", content = "response_data", rename_all = "snake_case")]
pub enum FinalResponse {
    SqlQuery {
        original_question: String,
        generated_sql: String,
        query_results: Vec<serde_json::Value>,
        natural_language_answer: String,
    },
    DocumentSearch {
        original_query: String,
        retrieved_documents: Vec<RetrievedDocument>,
        answer: String,
        total_results: usize,
    },
    CustomerService {
        original_inquiry: String,
        category: CustomerCategory,
        suggested_response: String,
    },
    QueryConfirmation {
        original_query: String,
        rewritten_query: String,
        reason: String,
        /// Exactly three option strings presented to the user.
        actions: [String; 3],
    },
    ClarificationNeeded {
        clarification_prompt: String,
    },
    Unsupported {
        message: String,
    },
}

impl FinalResponse {
    /// The user-visible text persisted as the assistant turn's content.
    pub fn display_text(&self) -> String {
        match self {
            FinalResponse::SqlQuery {
                natural_language_answer,
                ..
            } => natural_language_answer.clone(),
            FinalResponse::DocumentSearch { answer, .. } => answer.clone(),
            FinalResponse::CustomerService {
                suggested_response, ..
            } => suggested_response.clone(),
            FinalResponse::QueryConfirmation {
                original_query,
                rewritten_query,
                ..
            } => format!(
                "Did you mean \"{rewritten_query}\" instead of \"{original_query}\"? \
                 Reply \"yes\" to search with the correction, \"original\" to search \
                 as-is, or \"no\" to rephrase."
            ),
            FinalResponse::ClarificationNeeded {
                clarification_prompt,
            } => clarification_prompt.clone(),
            FinalResponse::Unsupported { message } => message.clone(),
        }
    }

    /// Wrap this response as the terminal progress event for a session.
    pub fn into_event(self, session_id: Uuid) -> ProgressEvent {
        let data = serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string());
        ProgressEvent::new(EventType::FinalResponse, data, session_id)
    }
}

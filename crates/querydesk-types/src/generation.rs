//! Generation capability request/response types.
//!
//! The language-generation capability is an external collaborator: text
//! in, structured text out, may fail or time out. These types model that
//! boundary; the HTTP client lives in querydesk-infra.

use serde::{Deserialize, Serialize};

/// A request to the generation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Instruction prompt establishing the task and output contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The user-facing input (message, query, or composed context).
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    /// Build a request with the default output budget.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            prompt: prompt.into(),
            temperature: None,
            max_output_tokens: 1024,
        }
    }
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Raw model output, possibly wrapped in a markdown code fence.
    pub text: String,
}

/// Errors from the generation or embedding capability.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("unparseable output: {0}")]
    InvalidOutput(String),
}

//! GenerationProvider trait definition.
//!
//! The abstraction over the external language-generation capability.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).
//! Implementations live in querydesk-infra (e.g., `GeminiClient`).

use querydesk_types::generation::{GenerationError, GenerationRequest, GenerationResponse};

/// Trait for the language-generation capability.
///
/// A provider turns a prompt into structured text. It may fail or time
/// out; callers decide retry policy at this boundary, never inside the
/// routing state machine.
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and receive the full response.
    fn complete(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GenerationResponse, GenerationError>> + Send;
}

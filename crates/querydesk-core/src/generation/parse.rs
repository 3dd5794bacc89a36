//! Parsing of structured generation output.
//!
//! Providers are prompted to return bare JSON, but models routinely wrap
//! it in a markdown code fence (```json ... ```). Every structured call
//! site goes through [`parse_json_payload`] so fence handling lives in
//! one place.

use serde::de::DeserializeOwned;

use querydesk_types::generation::GenerationError;

/// Strip a surrounding markdown code fence, if present.
///
/// Handles ```json and bare ``` fences with or without trailing
/// newlines. Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a provider response into a typed payload.
///
/// Returns `GenerationError::InvalidOutput` when the text (after fence
/// stripping) is not the expected JSON shape.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|e| {
        GenerationError::InvalidOutput(format!("expected JSON object: {e}"))
    })
}

//! Knowledge-base document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored knowledge-base document.
///
/// The embedding is optional: documents indexed while the embedding
/// capability was unavailable fall back to lexical retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Free-form metadata (source, tags, author).
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// A short word-boundary snippet of the content for result listings.
    pub fn snippet(&self, max_chars: usize) -> String {
        let content = self.content.trim();
        if content.len() <= max_chars {
            return content.to_string();
        }
        let mut end = max_chars;
        while end > 0 && !content.is_char_boundary(end) {
            end -= 1;
        }
        let truncated = &content[..end];
        let cut = truncated.rfind(char::is_whitespace).unwrap_or(end);
        format!("{}...", truncated[..cut].trim_end())
    }
}

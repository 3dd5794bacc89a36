//! Router configuration.
//!
//! `RouterConfig` represents the top-level `config.toml` controlling the
//! routing core: history window, relevance threshold, SQL limits, and
//! capability model names. All fields have sensible defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the routing core.
///
/// Loaded from `$QUERYDESK_DATA_DIR/config.toml` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Number of recent turns handed to the classifier as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Minimum relevance score for a retrieved document to be included.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Maximum documents carried into answer synthesis.
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Hard cap on rows returned from the SQL branch.
    #[serde(default = "default_max_sql_rows")]
    pub max_sql_rows: usize,

    /// Tables the SQL branch may reference.
    #[serde(default = "default_allowed_tables")]
    pub allowed_tables: Vec<String>,

    /// Generation model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Expected embedding vector width.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Texts longer than this are truncated before embedding.
    #[serde(default = "default_max_embed_chars")]
    pub max_embed_chars: usize,
}

fn default_history_window() -> usize {
    10
}

fn default_relevance_threshold() -> f32 {
    0.3
}

fn default_max_documents() -> usize {
    10
}

fn default_max_sql_rows() -> usize {
    100
}

fn default_allowed_tables() -> Vec<String> {
    vec!["orders".to_string()]
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_max_embed_chars() -> usize {
    20_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            relevance_threshold: default_relevance_threshold(),
            max_documents: default_max_documents(),
            max_sql_rows: default_max_sql_rows(),
            allowed_tables: default_allowed_tables(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            max_embed_chars: default_max_embed_chars(),
        }
    }
}

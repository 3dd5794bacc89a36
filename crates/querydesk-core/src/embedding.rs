//! Embedder trait definition.
//!
//! The abstraction over the external embedding capability (text in,
//! fixed-dimension vector out, batchable). Failure is non-fatal:
//! document search degrades to lexical retrieval when embeddings are
//! unavailable.

use querydesk_types::generation::GenerationError;

/// Trait for the embedding capability.
///
/// Implementations live in querydesk-infra (e.g., `GeminiEmbedder`).
pub trait Embedder: Send + Sync {
    /// Width of the vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a search query.
    fn embed_query(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, GenerationError>> + Send;

    /// Embed a batch of documents for indexing.
    fn embed_documents(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, GenerationError>> + Send;
}

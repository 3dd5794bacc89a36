//! DocumentStore trait definition.
//!
//! Candidate retrieval for the document-search branch. Retrieval is
//! pluggable: vector similarity when the query and documents carry
//! embeddings, lexical keyword scoring otherwise. Both return candidates
//! with a 0-1 relevance score; threshold filtering and ranking happen in
//! the pipeline, not the store.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use querydesk_types::document::Document;
use querydesk_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for knowledge-base documents.
///
/// Implementations live in querydesk-infra (e.g., `SqliteDocumentStore`).
pub trait DocumentStore: Send + Sync {
    /// Store a document (with or without an embedding).
    fn insert(
        &self,
        document: &Document,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch one document by ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Document>, RepositoryError>> + Send;

    /// Keyword-scored candidates for the given search terms, best first.
    fn search_lexical(
        &self,
        terms: &[String],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<(Document, f32)>, RepositoryError>> + Send;

    /// Cosine-scored candidates nearest the query embedding, best first.
    /// Documents without embeddings are not candidates here.
    fn search_embedding(
        &self,
        query: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<(Document, f32)>, RepositoryError>> + Send;
}

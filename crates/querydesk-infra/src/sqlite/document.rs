//! SQLite document store implementation.
//!
//! Documents live in one table; embeddings are stored as little-endian
//! f32 BLOBs. Candidate scoring uses the shared helpers from
//! querydesk-core so the SQLite store and the in-memory test store rank
//! identically.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use querydesk_core::document::score::{cosine_similarity, lexical_score};
use querydesk_core::document::store::DocumentStore;
use querydesk_types::document::Document;
use querydesk_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DocumentStore`.
pub struct SqliteDocumentStore {
    pool: DatabasePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_all(&self) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM documents")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc_row =
                DocumentRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            documents.push(doc_row.into_document()?);
        }
        Ok(documents)
    }
}

struct DocumentRow {
    id: String,
    title: String,
    content: String,
    metadata: String,
    embedding: Option<Vec<u8>>,
    created_at: String,
}

impl DocumentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            metadata: row.try_get("metadata")?,
            embedding: row.try_get("embedding")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_document(self) -> Result<Document, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid document id: {e}")))?;
        let metadata: serde_json::Value = serde_json::from_str(&self.metadata)
            .map_err(|e| RepositoryError::Query(format!("invalid metadata: {e}")))?;
        let embedding = self.embedding.as_deref().map(decode_embedding).transpose()?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?;

        Ok(Document {
            id,
            title: self.title,
            content: self.content,
            metadata,
            embedding,
            created_at,
        })
    }
}

/// Encode a vector as a little-endian f32 BLOB.
fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 BLOB back into a vector.
fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if bytes.len() % 4 != 0 {
        return Err(RepositoryError::Query(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&document.metadata)
            .map_err(|e| RepositoryError::Query(format!("unserializable metadata: {e}")))?;

        sqlx::query(
            r#"INSERT INTO documents (id, title, content, metadata, embedding, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(document.id.to_string())
        .bind(&document.title)
        .bind(&document.content)
        .bind(metadata)
        .bind(document.embedding.as_deref().map(encode_embedding))
        .bind(document.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let doc_row = DocumentRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(doc_row.into_document()?))
            }
            None => Ok(None),
        }
    }

    async fn search_lexical(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<(Document, f32)>, RepositoryError> {
        let mut scored: Vec<(Document, f32)> = self
            .load_all()
            .await?
            .into_iter()
            .map(|d| {
                let score = lexical_score(terms, &d.title, &d.content);
                (d, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn search_embedding(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(Document, f32)>, RepositoryError> {
        let mut scored: Vec<(Document, f32)> = self
            .load_all()
            .await?
            .into_iter()
            .filter_map(|d| {
                let score = d.embedding.as_ref().map(|e| cosine_similarity(query, e))?;
                Some((d, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }
}

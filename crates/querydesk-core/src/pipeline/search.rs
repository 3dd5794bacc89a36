//! Document search branch pipeline.
//!
//! Retrieval is pluggable: cosine similarity over embeddings when the
//! embedding capability is up, lexical keyword scoring otherwise.
//! Candidates below the relevance threshold are dropped, survivors are
//! ranked score-descending, and an answer is synthesized from the top
//! subset. `total_results` is always reported, zero included.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use querydesk_types::config::RouterConfig;
use querydesk_types::document::Document;
use querydesk_types::error::ChatError;
use querydesk_types::event::{EventType, FinalResponse, RetrievedDocument};
use querydesk_types::generation::GenerationRequest;

use crate::document::store::DocumentStore;
use crate::embedding::Embedder;
use crate::generation::parse::parse_json_payload;
use crate::generation::provider::GenerationProvider;
use crate::pipeline::EventSink;

const SYNTHESIZER_SYSTEM_PROMPT: &str = r#"You are an expert answer synthesizer. Create a concise, accurate answer to the user's query based only on the retrieved documents.

- Synthesize across documents when possible and cite sources by title
- Never make up information not present in the documents
- Acknowledge when the documents only partially answer the query

Return ONLY a JSON object in this exact format:
{"answer": "natural language answer", "sources_used": ["Document Title"], "confidence": 0.9}"#;

/// Characters kept in a result snippet.
const SNIPPET_CHARS: usize = 200;

/// How many candidates to pull from the store before threshold
/// filtering. Wider than the final cut so the threshold does the work.
const CANDIDATE_POOL: usize = 20;

#[derive(Debug, Deserialize)]
struct SynthesizedAnswer {
    answer: String,
}

/// Answers knowledge-base queries from retrieved documents.
pub struct SearchPipeline<P: GenerationProvider, D: DocumentStore, E: Embedder> {
    provider: Arc<P>,
    store: Arc<D>,
    embedder: Arc<E>,
    config: Arc<RouterConfig>,
}

impl<P: GenerationProvider, D: DocumentStore, E: Embedder> SearchPipeline<P, D, E> {
    pub fn new(provider: Arc<P>, store: Arc<D>, embedder: Arc<E>, config: Arc<RouterConfig>) -> Self {
        Self {
            provider,
            store,
            embedder,
            config,
        }
    }

    pub async fn run(&self, query: &str, sink: &EventSink) -> Result<FinalResponse, ChatError> {
        sink.emit(EventType::Searching, format!("Searching documents for \"{query}\""))
            .await;
        let candidates = self.retrieve(query).await?;

        sink.emit(EventType::Ranking, "Ranking results by relevance").await;
        let ranked = self.rank(candidates);
        let total_results = ranked.len();

        sink.emit(EventType::Synthesizing, "Composing an answer").await;
        let answer = if ranked.is_empty() {
            // No documents passed the threshold; no generation call is
            // needed to say so, and the cleaned query keeps the message
            // grammatical.
            format!(
                "I couldn't find any documents about {query}. The knowledge base may \
                 not contain information about {query}."
            )
        } else {
            self.synthesize(query, &ranked).await?
        };

        Ok(FinalResponse::DocumentSearch {
            original_query: query.to_string(),
            retrieved_documents: ranked,
            answer,
            total_results,
        })
    }

    /// Pull candidates by vector similarity, degrading to lexical
    /// scoring when the embedding capability is down or nothing in the
    /// store carries an embedding.
    async fn retrieve(&self, query: &str) -> Result<Vec<(Document, f32)>, ChatError> {
        match self.embedder.embed_query(query).await {
            Ok(vector) => {
                let hits = self
                    .store
                    .search_embedding(&vector, CANDIDATE_POOL)
                    .await
                    .map_err(|e| ChatError::RetrievalFailure(e.to_string()))?;
                if !hits.is_empty() {
                    return Ok(hits);
                }
                debug!("no embedded candidates, falling back to lexical retrieval");
            }
            Err(e) => {
                debug!(error = %e, "embedding unavailable, falling back to lexical retrieval");
            }
        }
        let terms = search_terms(query);
        self.store
            .search_lexical(&terms, CANDIDATE_POOL)
            .await
            .map_err(|e| ChatError::RetrievalFailure(e.to_string()))
    }

    /// Threshold-filter, sort score-descending, cap, and snippet.
    fn rank(&self, candidates: Vec<(Document, f32)>) -> Vec<RetrievedDocument> {
        let mut kept: Vec<(Document, f32)> = candidates
            .into_iter()
            .filter(|(_, score)| *score >= self.config.relevance_threshold)
            .collect();
        kept.sort_by(|a, b| b.1.total_cmp(&a.1));
        kept.truncate(self.config.max_documents);
        kept.into_iter()
            .map(|(doc, score)| RetrievedDocument {
                document_id: doc.id,
                title: doc.title.clone(),
                snippet: doc.snippet(SNIPPET_CHARS),
                relevance_score: score,
            })
            .collect()
    }

    async fn synthesize(
        &self,
        query: &str,
        documents: &[RetrievedDocument],
    ) -> Result<String, ChatError> {
        let mut context = format!("Query: {query}\n\nRetrieved documents:\n");
        for doc in documents {
            context.push_str(&format!(
                "- {} (relevance {:.2}): {}\n",
                doc.title, doc.relevance_score, doc.snippet
            ));
        }
        let request = GenerationRequest::new(SYNTHESIZER_SYSTEM_PROMPT, context);
        let response = self.provider.complete(&request).await?;
        let synthesized: SynthesizedAnswer = parse_json_payload(&response.text)?;
        Ok(synthesized.answer)
    }
}

/// Words that carry no search signal on their own.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "for", "about", "on", "in", "to", "and", "or", "is", "are", "what",
    "how", "me", "my", "with",
];

/// Split a query into lowercase search terms, dropping stopwords.
///
/// Falls back to the whole-word split when everything was a stopword,
/// so the term list is never empty for a non-empty query.
pub fn search_terms(query: &str) -> Vec<String> {
    let words: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect();
    let filtered: Vec<String> = words
        .iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .cloned()
        .collect();
    if filtered.is_empty() {
        words
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{MemoryDocumentStore, ScriptedEmbedder, ScriptedProvider};
    use chrono::Utc;
    use querydesk_types::event::ProgressEvent;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn doc(title: &str, content: &str, embedding: Option<Vec<f32>>) -> Document {
        Document {
            id: Uuid::now_v7(),
            title: title.to_string(),
            content: content.to_string(),
            metadata: serde_json::json!({}),
            embedding,
            created_at: Utc::now(),
        }
    }

    fn sink() -> (EventSink, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (EventSink::new(tx, Uuid::now_v7()), rx)
    }

    fn pipeline(
        provider: ScriptedProvider,
        store: MemoryDocumentStore,
        embedder: ScriptedEmbedder,
    ) -> SearchPipeline<ScriptedProvider, MemoryDocumentStore, ScriptedEmbedder> {
        SearchPipeline::new(
            Arc::new(provider),
            Arc::new(store),
            Arc::new(embedder),
            Arc::new(RouterConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_embedding_retrieval_ranks_descending() {
        let store = MemoryDocumentStore::with_documents(vec![
            doc("African history", "peoples of the continent", Some(vec![1.0, 0.0])),
            doc("Pacific islands", "unrelated", Some(vec![0.0, 1.0])),
            doc("African cultures", "traditions and languages", Some(vec![0.9, 0.1])),
        ]);
        let embedder = ScriptedEmbedder::new(2).script("African people", vec![1.0, 0.0]);
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"answer": "Based on African history and African cultures...", "sources_used": ["African history"], "confidence": 0.9}"#,
        ]);
        let p = pipeline(provider, store, embedder);
        let (sink, _rx) = sink();

        let response = p.run("African people", &sink).await.unwrap();
        match response {
            FinalResponse::DocumentSearch {
                retrieved_documents,
                total_results,
                answer,
                original_query,
            } => {
                assert_eq!(original_query, "African people");
                assert_eq!(total_results, retrieved_documents.len());
                assert_eq!(retrieved_documents.len(), 2, "orthogonal doc filtered out");
                assert!(retrieved_documents[0].relevance_score
                    >= retrieved_documents[1].relevance_score);
                assert!(retrieved_documents
                    .iter()
                    .all(|d| d.relevance_score >= 0.3));
                assert!(answer.contains("African"));
            }
            other => panic!("expected document search response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lexical_fallback_when_embedder_down() {
        let store = MemoryDocumentStore::with_documents(vec![
            doc("FastAPI Framework Overview", "FastAPI is a Python web framework", None),
            doc("Cooking basics", "recipes and food", None),
        ]);
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"answer": "FastAPI is a Python web framework.", "sources_used": ["FastAPI Framework Overview"], "confidence": 0.9}"#,
        ]);
        let p = pipeline(provider, store, ScriptedEmbedder::failing());
        let (sink, _rx) = sink();

        let response = p.run("FastAPI", &sink).await.unwrap();
        match response {
            FinalResponse::DocumentSearch {
                retrieved_documents,
                total_results,
                ..
            } => {
                assert_eq!(total_results, 1);
                assert_eq!(retrieved_documents[0].title, "FastAPI Framework Overview");
            }
            other => panic!("expected document search response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_results_reports_total_without_generation() {
        let provider = ScriptedProvider::with_responses(vec![]);
        let provider = Arc::new(provider);
        let p = SearchPipeline::new(
            provider.clone(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(ScriptedEmbedder::failing()),
            Arc::new(RouterConfig::default()),
        );
        let (sink, _rx) = sink();

        let response = p.run("quantum computing", &sink).await.unwrap();
        match response {
            FinalResponse::DocumentSearch {
                retrieved_documents,
                total_results,
                answer,
                ..
            } => {
                assert_eq!(total_results, 0);
                assert!(retrieved_documents.is_empty());
                assert!(answer.contains("quantum computing"));
            }
            other => panic!("expected document search response, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_retrieval_failure() {
        let p = pipeline(
            ScriptedProvider::with_responses(vec![]),
            MemoryDocumentStore::failing(),
            ScriptedEmbedder::failing(),
        );
        let (sink, _rx) = sink();

        let result = p.run("anything", &sink).await;
        assert!(matches!(result, Err(ChatError::RetrievalFailure(_))));
    }

    #[tokio::test]
    async fn test_event_order_ends_before_terminal() {
        let provider = ScriptedProvider::with_responses(vec![]);
        let p = pipeline(provider, MemoryDocumentStore::new(), ScriptedEmbedder::failing());
        let (sink, mut rx) = sink();

        p.run("nothing here", &sink).await.unwrap();
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type);
        }
        assert_eq!(
            kinds,
            vec![EventType::Searching, EventType::Ranking, EventType::Synthesizing]
        );
    }

    #[test]
    fn test_search_terms_drop_stopwords() {
        assert_eq!(
            search_terms("documents about the African people"),
            vec!["documents", "african", "people"]
        );
    }

    #[test]
    fn test_search_terms_never_empty_for_nonempty_query() {
        assert_eq!(search_terms("what is the"), vec!["what", "is", "the"]);
    }
}

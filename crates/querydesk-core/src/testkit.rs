//! Scripted and in-memory fakes for unit tests.
//!
//! `ScriptedProvider` replays canned generation responses in order;
//! the in-memory stores back the repository traits without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use querydesk_types::document::Document;
use querydesk_types::error::RepositoryError;
use querydesk_types::generation::{GenerationError, GenerationRequest, GenerationResponse};
use querydesk_types::turn::{ChatSession, Feedback, Turn};

use crate::document::score::{cosine_similarity, lexical_score};
use crate::document::store::DocumentStore;
use crate::embedding::Embedder;
use crate::generation::provider::GenerationProvider;
use crate::sqlexec::{SqlExecutor, SqlRow};
use crate::turn::repository::TurnRepository;

/// Generation provider that replays canned responses in order.
///
/// Records every prompt it receives so tests can assert on what was
/// sent. Running out of scripted responses is a test bug and panics.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedProvider {
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A provider whose every call fails with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Number of completed calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if self.fail {
            return Err(GenerationError::Unavailable("scripted failure".to_string()));
        }
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider ran out of responses");
        Ok(GenerationResponse { text })
    }
}

/// In-memory [`TurnRepository`] with the same observable behavior as the
/// SQLite implementation: sessions own turns, append bumps counts.
pub struct MemoryTurnRepository {
    sessions: Mutex<HashMap<Uuid, ChatSession>>,
    turns: Mutex<Vec<Turn>>,
}

impl MemoryTurnRepository {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            turns: Mutex::new(Vec::new()),
        }
    }
}

impl TurnRepository for MemoryTurnRepository {
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, RepositoryError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let mut sessions: Vec<ChatSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn update_session_title(
        &self,
        session_id: &Uuid,
        title: &str,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).ok_or(RepositoryError::NotFound)?;
        session.title = title.to_string();
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn touch_session(&self, session_id: &Uuid) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(session_id).ok_or(RepositoryError::NotFound)?;
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        if self.sessions.lock().unwrap().remove(session_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let mut turns = self.turns.lock().unwrap();
        let before = turns.len();
        turns.retain(|t| t.session_id != *session_id);
        Ok((before - turns.len()) as u64)
    }

    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        self.turns.lock().unwrap().push(turn.clone());
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&turn.session_id) {
            session.message_count += 1;
            session.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn get_turns(
        &self,
        session_id: &Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let turns: Vec<Turn> = self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == *session_id)
            .cloned()
            .collect();
        // Keep the most recent `limit`, still oldest first.
        match limit {
            Some(limit) if turns.len() > limit => Ok(turns[turns.len() - limit..].to_vec()),
            _ => Ok(turns),
        }
    }

    async fn count_turns(&self, session_id: &Uuid) -> Result<u32, RepositoryError> {
        Ok(self
            .turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == *session_id)
            .count() as u32)
    }

    async fn set_feedback(
        &self,
        turn_id: &Uuid,
        feedback: Option<Feedback>,
    ) -> Result<(), RepositoryError> {
        let mut turns = self.turns.lock().unwrap();
        let turn = turns
            .iter_mut()
            .find(|t| t.id == *turn_id)
            .ok_or(RepositoryError::NotFound)?;
        turn.feedback = feedback;
        Ok(())
    }
}

/// In-memory [`DocumentStore`] scoring candidates with the shared
/// helpers from [`crate::document::score`].
pub struct MemoryDocumentStore {
    documents: Mutex<Vec<Document>>,
    fail: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A store whose every call fails, for retrieval-failure paths.
    pub fn failing() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            fail: false,
        }
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Connection);
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), RepositoryError> {
        self.check()?;
        self.documents.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        self.check()?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == *id)
            .cloned())
    }

    async fn search_lexical(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<(Document, f32)>, RepositoryError> {
        self.check()?;
        let mut scored: Vec<(Document, f32)> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| (d.clone(), lexical_score(terms, &d.title, &d.content)))
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
        self.check()?;
        let mut scored: Vec<(Document, f32)> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter_map(|d| {
                d.embedding
                    .as_ref()
                    .map(|e| (d.clone(), cosine_similarity(query, e)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }
}

/// Embedder returning a fixed vector per known text, failing otherwise.
pub struct ScriptedEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    dimension: usize,
    fail: bool,
}

impl ScriptedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            dimension,
            fail: false,
        }
    }

    /// An embedder whose every call fails, for lexical-fallback paths.
    pub fn failing() -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            dimension: 0,
            fail: true,
        }
    }

    pub fn script(self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        if self.fail {
            return Err(GenerationError::Unavailable("scripted failure".to_string()));
        }
        self.vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| GenerationError::InvalidOutput(format!("no scripted vector for '{text}'")))
    }
}

impl Embedder for ScriptedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        self.lookup(text)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GenerationError> {
        texts.iter().map(|t| self.lookup(t)).collect()
    }
}

/// SQL executor returning canned rows, recording executed statements.
pub struct ScriptedSqlExecutor {
    rows: Vec<SqlRow>,
    executed: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl ScriptedSqlExecutor {
    pub fn with_rows(rows: Vec<SqlRow>) -> Self {
        Self {
            rows,
            executed: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// An executor whose every call fails, for store-outage paths.
    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            executed: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// (sql, user_id) pairs executed, in call order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().unwrap().clone()
    }
}

impl SqlExecutor for ScriptedSqlExecutor {
    async fn execute_select(
        &self,
        sql: &str,
        user_id: &str,
        max_rows: usize,
    ) -> Result<Vec<SqlRow>, RepositoryError> {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), user_id.to_string()));
        if self.fail {
            return Err(RepositoryError::Connection);
        }
        let mut rows = self.rows.clone();
        rows.truncate(max_rows);
        Ok(rows)
    }
}

/// A row builder for executor scripts.
pub fn sql_row(pairs: &[(&str, serde_json::Value)]) -> SqlRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

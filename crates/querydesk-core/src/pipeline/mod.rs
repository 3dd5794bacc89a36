//! Branch pipelines and the dispatcher.
//!
//! Each handling path is a pipeline that emits an ordered sequence of
//! progress events and produces exactly one [`FinalResponse`]. Events
//! are observational only; the caller must never branch on them.

pub mod search;
pub mod service;
pub mod sql;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use querydesk_types::config::RouterConfig;
use querydesk_types::error::ChatError;
use querydesk_types::event::{EventType, FinalResponse, ProgressEvent};
use querydesk_types::route::{QueryType, RouteDecision};
use querydesk_types::turn::RewriteProposal;

use crate::document::store::DocumentStore;
use crate::embedding::Embedder;
use crate::generation::provider::GenerationProvider;
use crate::sqlexec::SqlExecutor;

pub use search::SearchPipeline;
pub use service::CustomerServicePipeline;
pub use sql::SqlPipeline;

/// Emits progress events for one request's stream.
///
/// Sends are best-effort: a dropped receiver means the transport went
/// away, which the orchestrator detects via [`EventSink::is_closed`]
/// before persisting anything at the terminal step.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
    session_id: Uuid,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>, session_id: Uuid) -> Self {
        Self { tx, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Emit a progress event. A failed send is ignored; the caller
    /// checks [`Self::is_closed`] at the terminal step instead.
    pub async fn emit(&self, event_type: EventType, data: impl Into<String>) {
        let event = ProgressEvent::new(event_type, data, self.session_id);
        let _ = self.tx.send(event).await;
    }

    /// Whether the receiving end has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Fixed text for messages outside every supported domain.
pub fn unsupported_response() -> FinalResponse {
    FinalResponse::Unsupported {
        message: "I can help with three kinds of requests: questions about your own \
                  orders and account data, searches over the document knowledge base, \
                  and customer-service inquiries. This one looks outside those, so I \
                  can't help with it."
            .to_string(),
    }
}

/// Fixed prompt asking the user to narrow a vague request.
pub fn clarification_response() -> FinalResponse {
    FinalResponse::ClarificationNeeded {
        clarification_prompt: "Could you be more specific? For example, ask about your \
                               orders (\"How many orders do I have?\"), search the \
                               knowledge base (\"Find documents about FastAPI\"), or \
                               describe a problem with your account."
            .to_string(),
    }
}

/// Prompt sent when a confirmation reply declined the rewrite (or did
/// not parse) and the user should restate the search.
pub fn rephrase_response() -> FinalResponse {
    FinalResponse::ClarificationNeeded {
        clarification_prompt: "No problem. Please rephrase your search and I'll try \
                               again."
            .to_string(),
    }
}

/// The confirmation request presented for a pending rewrite proposal.
pub fn confirmation_response(proposal: &RewriteProposal) -> FinalResponse {
    FinalResponse::QueryConfirmation {
        original_query: proposal.original_query.clone(),
        rewritten_query: proposal.rewritten_query.clone(),
        reason: proposal.reason.clone(),
        actions: [
            format!("Yes, search for \"{}\"", proposal.rewritten_query),
            "No, I'll rephrase".to_string(),
            format!("Search for \"{}\" as-is", proposal.original_query),
        ],
    }
}

/// Routes a resolved decision to exactly one branch pipeline.
///
/// Exhaustive over [`QueryType`] so adding a route is a compile-time
/// checked change at this one site.
pub struct Dispatcher<P, D, E, S>
where
    P: GenerationProvider,
    D: DocumentStore,
    E: Embedder,
    S: SqlExecutor,
{
    sql: SqlPipeline<P, S>,
    search: SearchPipeline<P, D, E>,
    service: CustomerServicePipeline<P>,
}

impl<P, D, E, S> Dispatcher<P, D, E, S>
where
    P: GenerationProvider,
    D: DocumentStore,
    E: Embedder,
    S: SqlExecutor,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<D>,
        embedder: Arc<E>,
        executor: Arc<S>,
        config: Arc<RouterConfig>,
    ) -> Self {
        Self {
            sql: SqlPipeline::new(provider.clone(), executor, config.clone()),
            search: SearchPipeline::new(provider.clone(), store, embedder, config),
            service: CustomerServicePipeline::new(provider),
        }
    }

    /// Run the branch matching the decision and return its terminal
    /// response. Failures propagate to the caller, which converts them
    /// to a terminal `error` event; raw detail never reaches the user.
    pub async fn dispatch(
        &self,
        decision: &RouteDecision,
        user_id: Option<&str>,
        sink: &EventSink,
    ) -> Result<FinalResponse, ChatError> {
        match decision.query_type {
            QueryType::SqlQuery => {
                let Some(user_id) = user_id else {
                    return Err(ChatError::InvalidInput(
                        "Questions about your data need a signed-in user.".to_string(),
                    ));
                };
                self.sql.run(&decision.target_query, user_id, sink).await
            }
            QueryType::DocumentSearch => self.search.run(&decision.target_query, sink).await,
            QueryType::CustomerService => self.service.run(&decision.target_query, sink).await,
            QueryType::ClarificationNeeded => Ok(clarification_response()),
            QueryType::Unsupported => Ok(unsupported_response()),
            // Confirmation turns are produced by the orchestrator before
            // dispatch; reaching here means a stale route tag, so ask
            // rather than guess.
            QueryType::QueryConfirmation => {
                debug!("query_confirmation reached the dispatcher, treating as ambiguous");
                Ok(clarification_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{
        MemoryDocumentStore, ScriptedEmbedder, ScriptedProvider, ScriptedSqlExecutor,
    };
    use tokio::sync::mpsc;

    fn dispatcher(
        provider: ScriptedProvider,
    ) -> Dispatcher<ScriptedProvider, MemoryDocumentStore, ScriptedEmbedder, ScriptedSqlExecutor>
    {
        Dispatcher::new(
            Arc::new(provider),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(ScriptedEmbedder::failing()),
            Arc::new(ScriptedSqlExecutor::with_rows(vec![])),
            Arc::new(RouterConfig::default()),
        )
    }

    fn sink() -> (EventSink, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (EventSink::new(tx, Uuid::now_v7()), rx)
    }

    fn decision(query_type: QueryType, target: &str) -> RouteDecision {
        RouteDecision {
            query_type,
            confidence: None,
            rationale: None,
            target_query: target.to_string(),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_dispatch_unsupported_makes_no_calls() {
        let provider = ScriptedProvider::with_responses(vec![]);
        let d = dispatcher(provider);
        let (sink, rx) = sink();

        let response = d
            .dispatch(&decision(QueryType::Unsupported, "Tell me a joke"), None, &sink)
            .await
            .unwrap();
        assert!(matches!(response, FinalResponse::Unsupported { .. }));
        // Static branch: no progress events, no generation calls.
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_clarification_is_static() {
        let d = dispatcher(ScriptedProvider::with_responses(vec![]));
        let (sink, _rx) = sink();

        let response = d
            .dispatch(
                &decision(QueryType::ClarificationNeeded, "I need help"),
                None,
                &sink,
            )
            .await
            .unwrap();
        assert!(matches!(response, FinalResponse::ClarificationNeeded { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_sql_without_user_is_invalid_input() {
        let d = dispatcher(ScriptedProvider::with_responses(vec![]));
        let (sink, _rx) = sink();

        let result = d
            .dispatch(&decision(QueryType::SqlQuery, "How many orders?"), None, &sink)
            .await;
        assert!(matches!(result, Err(ChatError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_sink_reports_closed_after_receiver_drop() {
        let (tx, rx) = mpsc::channel::<ProgressEvent>(4);
        let sink = EventSink::new(tx, Uuid::now_v7());
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
        // Emitting into a closed sink is a no-op, not a panic.
        sink.emit(EventType::Status, "late").await;
    }

    #[test]
    fn test_confirmation_response_actions_cover_all_three_replies() {
        let proposal = RewriteProposal {
            original_query: "Africa people".to_string(),
            rewritten_query: "African people".to_string(),
            reason: "adjective form".to_string(),
        };
        let response = confirmation_response(&proposal);
        match response {
            FinalResponse::QueryConfirmation {
                actions,
                original_query,
                rewritten_query,
                ..
            } => {
                assert_eq!(original_query, "Africa people");
                assert_eq!(rewritten_query, "African people");
                assert!(actions[0].contains("African people"));
                assert!(actions[1].to_lowercase().contains("rephrase"));
                assert!(actions[2].contains("Africa people"));
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
    }
}

//! Session orchestrator: the per-message state machine.
//!
//! `Idle -> Classifying -> (RewritePending | Dispatching) -> Responding
//! -> Idle`. The pending-confirmation condition is a queryable property
//! of the last persisted turn, never ambient memory: when the
//! immediately preceding assistant turn carries a live
//! [`RewriteProposal`](querydesk_types::turn::RewriteProposal),
//! classification is bypassed and the reply is resolved against it.
//! Every request ends back in `Idle`; state spans requests only through
//! the conversation history.
//!
//! Concurrent messages to the same session are serialized by a
//! per-session async mutex, so history reads and appends for one
//! session never interleave.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use querydesk_types::config::RouterConfig;
use querydesk_types::error::ChatError;
use querydesk_types::event::{EventType, FinalResponse, ProgressEvent};
use querydesk_types::route::{ConfirmationOutcome, QueryType, RewriteResult, RouteDecision};
use querydesk_types::turn::{Turn, TurnPayload, TurnRole};

use crate::document::store::DocumentStore;
use crate::embedding::Embedder;
use crate::generation::provider::GenerationProvider;
use crate::pipeline::{confirmation_response, rephrase_response, Dispatcher, EventSink};
use crate::router::{confirm, rewrite, IntentClassifier, RewriteAnalyzer};
use crate::sqlexec::SqlExecutor;
use crate::turn::repository::TurnRepository;
use crate::turn::service::derive_title;

/// One incoming chat message, already bound to a session.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Uuid,
    pub user_id: Option<String>,
}

/// Ties the classifier, rewrite analyzer, confirmation resolver, and
/// dispatcher together per incoming message.
pub struct SessionOrchestrator<P, T, D, E, S>
where
    P: GenerationProvider,
    T: TurnRepository,
    D: DocumentStore,
    E: Embedder,
    S: SqlExecutor,
{
    classifier: IntentClassifier<P>,
    rewriter: RewriteAnalyzer<P>,
    dispatcher: Dispatcher<P, D, E, S>,
    turns: Arc<T>,
    config: Arc<RouterConfig>,
    /// Per-session locks serializing concurrent messages to one session.
    session_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<P, T, D, E, S> SessionOrchestrator<P, T, D, E, S>
where
    P: GenerationProvider + 'static,
    T: TurnRepository + 'static,
    D: DocumentStore + 'static,
    E: Embedder + 'static,
    S: SqlExecutor + 'static,
{
    pub fn new(
        provider: Arc<P>,
        turns: Arc<T>,
        store: Arc<D>,
        embedder: Arc<E>,
        executor: Arc<S>,
        config: Arc<RouterConfig>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(provider.clone()),
            rewriter: RewriteAnalyzer::new(provider.clone()),
            dispatcher: Dispatcher::new(provider, store, embedder, executor, config.clone()),
            turns,
            config,
            session_locks: DashMap::new(),
        }
    }

    /// Handle one message, returning its ordered event stream.
    ///
    /// The stream ends after exactly one terminal event
    /// (`final_response` or `error`). Dropping the stream abandons the
    /// in-flight work; no assistant turn is written unless processing
    /// reached a terminal outcome while the receiver was still attached.
    pub fn handle_message(self: &Arc<Self>, request: ChatRequest) -> ReceiverStream<ProgressEvent> {
        let (tx, rx) = mpsc::channel(32);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let sink = EventSink::new(tx, request.session_id);
            if let Err(e) = orchestrator.process(&request, &sink).await {
                warn!(session_id = %request.session_id, error = %e, "request failed");
                sink.emit(EventType::Error, e.user_message()).await;
            }
        });
        ReceiverStream::new(rx)
    }

    async fn process(&self, request: &ChatRequest, sink: &EventSink) -> Result<(), ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::InvalidInput(
                "Message must not be empty.".to_string(),
            ));
        }

        let lock = self
            .session_locks
            .entry(request.session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let history = self
            .turns
            .get_turns(&request.session_id, Some(self.config.history_window))
            .await?;
        let first_message = history.is_empty();
        let prior_turn = history.last().cloned();

        self.append_turn(request.session_id, TurnRole::User, message, None)
            .await?;

        // A live proposal on the immediately preceding assistant turn is
        // the one state where classification is bypassed.
        let decision = match confirm::resolve(message, prior_turn.as_ref()) {
            ConfirmationOutcome::UseRewritten(query) => {
                sink.emit(EventType::Routing, "Searching with the corrected query")
                    .await;
                Some(RouteDecision {
                    query_type: QueryType::DocumentSearch,
                    confidence: None,
                    rationale: Some("confirmed rewrite".to_string()),
                    target_query: query,
                })
            }
            ConfirmationOutcome::UseOriginal(query) => {
                sink.emit(EventType::Routing, "Searching with your original wording")
                    .await;
                // Best-effort cleanup so result text stays grammatical
                // even when the raw wording was declined for a reason.
                Some(RouteDecision {
                    query_type: QueryType::DocumentSearch,
                    confidence: None,
                    rationale: Some("rewrite declined".to_string()),
                    target_query: rewrite::strip_filler(&query),
                })
            }
            ConfirmationOutcome::NeedsRephrase => {
                debug!(session_id = %request.session_id, "confirmation reply did not parse");
                return self
                    .respond(request, sink, rephrase_response(), first_message)
                    .await;
            }
            ConfirmationOutcome::NotAPendingConfirmation => None,
        };

        let decision = match decision {
            Some(decision) => decision,
            None => {
                sink.emit(EventType::Routing, "Classifying your message").await;
                let decision = self.classifier.classify(message, &history).await?;
                info!(
                    session_id = %request.session_id,
                    query_type = %decision.query_type,
                    "message classified"
                );

                if decision.query_type == QueryType::DocumentSearch {
                    match self.rewriter.analyze(message).await {
                        RewriteResult::RewriteProposed { proposal } => {
                            // RewritePending: suspend across the full
                            // request/response cycle. The proposal lives
                            // on the persisted turn, nowhere else.
                            let response = confirmation_response(&proposal);
                            return self
                                .respond_with_payload(
                                    request,
                                    sink,
                                    response,
                                    TurnPayload::RewriteProposal(proposal),
                                    first_message,
                                )
                                .await;
                        }
                        RewriteResult::NoRewriteNeeded { clean_query } => RouteDecision {
                            target_query: clean_query,
                            ..decision
                        },
                    }
                } else {
                    decision
                }
            }
        };

        let response = self
            .dispatcher
            .dispatch(&decision, request.user_id.as_deref(), sink)
            .await?;
        self.respond(request, sink, response, first_message).await
    }

    /// Responding state: persist the assistant turn, then emit the
    /// terminal event.
    async fn respond(
        &self,
        request: &ChatRequest,
        sink: &EventSink,
        response: FinalResponse,
        first_message: bool,
    ) -> Result<(), ChatError> {
        let payload = TurnPayload::Route {
            query_type: route_of(&response),
        };
        self.respond_with_payload(request, sink, response, payload, first_message)
            .await
    }

    async fn respond_with_payload(
        &self,
        request: &ChatRequest,
        sink: &EventSink,
        response: FinalResponse,
        payload: TurnPayload,
        first_message: bool,
    ) -> Result<(), ChatError> {
        if sink.is_closed() {
            // Transport went away mid-stream: abandon without writing an
            // assistant turn, so no proposal is stranded unseen.
            debug!(session_id = %request.session_id, "stream closed, abandoning response");
            return Ok(());
        }

        self.append_turn(
            request.session_id,
            TurnRole::Assistant,
            &response.display_text(),
            Some(payload),
        )
        .await?;

        if first_message {
            let title = derive_title(&request.message);
            if let Err(e) = self
                .turns
                .update_session_title(&request.session_id, &title)
                .await
            {
                warn!(session_id = %request.session_id, error = %e, "auto-title failed");
            }
        }

        let session_id = request.session_id;
        sink.emit(EventType::FinalResponse, {
            serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
        })
        .await;
        debug!(session_id = %session_id, "request complete");
        Ok(())
    }

    async fn append_turn(
        &self,
        session_id: Uuid,
        role: TurnRole,
        content: &str,
        payload: Option<TurnPayload>,
    ) -> Result<(), ChatError> {
        let turn = Turn {
            id: Uuid::now_v7(),
            session_id,
            role,
            content: content.to_string(),
            payload,
            feedback: None,
            created_at: Utc::now(),
        };
        self.turns.append_turn(&turn).await?;
        Ok(())
    }
}

/// The route tag recorded on the assistant turn for a given response.
fn route_of(response: &FinalResponse) -> QueryType {
    match response {
        FinalResponse::SqlQuery { .. } => QueryType::SqlQuery,
        FinalResponse::DocumentSearch { .. } => QueryType::DocumentSearch,
        FinalResponse::CustomerService { .. } => QueryType::CustomerService,
        FinalResponse::QueryConfirmation { .. } => QueryType::QueryConfirmation,
        FinalResponse::ClarificationNeeded { .. } => QueryType::ClarificationNeeded,
        FinalResponse::Unsupported { .. } => QueryType::Unsupported,
    }
}

//! Intent classification.
//!
//! Maps a raw user message plus recent history to exactly one
//! [`QueryType`]. A cheap lexical prefilter catches obviously
//! out-of-domain messages (greetings, jokes, weather, code requests) so
//! those never cost a generation call; everything else goes to the
//! generation capability with a closed-set JSON contract.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use querydesk_types::error::ChatError;
use querydesk_types::route::{Confidence, QueryType, RouteDecision};
use querydesk_types::turn::Turn;

use crate::generation::parse::parse_json_payload;
use crate::generation::provider::GenerationProvider;
use querydesk_types::generation::GenerationRequest;

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a query classification agent for a customer data assistant. Classify the user's message into exactly one of these types:

- "sql_query": questions about the caller's own transactional data ("how many", "show me", "list", "count", "total", "my orders", statistics, reports)
- "document_search": requests for factual or conceptual information answerable from a knowledge base ("find documents about", "what is", "explain")
- "customer_service": problems, complaints, or account issues ("not working", "help with my account", "billing question", "refund")
- "clarification_needed": messages too vague to assign (e.g. "I need help")
- "unsupported": anything outside those domains (greetings, jokes, weather, requests to write code)

When in doubt between two types, prefer "clarification_needed" over guessing.

Recent conversation context, when provided, should be used to resolve short follow-ups ("how many do I have?" after an orders discussion is a sql_query).

Return ONLY a JSON object in this exact format:
{"query_type": "...", "confidence": "high" | "medium" | "low", "reasoning": "brief explanation"}"#;

/// Raw classifier verdict as returned by the generation capability.
#[derive(Debug, Deserialize)]
struct ClassifierVerdict {
    query_type: QueryType,
    confidence: Option<Confidence>,
    reasoning: Option<String>,
}

/// Classifies messages into handling paths.
pub struct IntentClassifier<P: GenerationProvider> {
    provider: Arc<P>,
}

impl<P: GenerationProvider> IntentClassifier<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Classify a non-empty message against recent history.
    ///
    /// Pure with respect to conversation state: nothing is persisted
    /// here. Fails with `ClassificationUnavailable` when the capability
    /// is down or returns an unparseable verdict.
    pub async fn classify(
        &self,
        message: &str,
        recent_history: &[Turn],
    ) -> Result<RouteDecision, ChatError> {
        if let Some(reason) = prefilter_unsupported(message) {
            debug!(reason, "message prefiltered as unsupported");
            return Ok(RouteDecision {
                query_type: QueryType::Unsupported,
                confidence: Some(Confidence::High),
                rationale: Some(reason.to_string()),
                target_query: message.to_string(),
            });
        }

        let prompt = build_prompt(message, recent_history);
        let request = GenerationRequest::new(CLASSIFIER_SYSTEM_PROMPT, prompt);
        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| ChatError::ClassificationUnavailable(e.to_string()))?;

        let verdict: ClassifierVerdict = parse_json_payload(&response.text)
            .map_err(|e| ChatError::ClassificationUnavailable(e.to_string()))?;

        // The confirmation route belongs to the rewrite analyzer, not
        // the classifier; a verdict claiming it is treated as ambiguous.
        let query_type = match verdict.query_type {
            QueryType::QueryConfirmation => QueryType::ClarificationNeeded,
            other => other,
        };

        Ok(RouteDecision {
            query_type,
            confidence: verdict.confidence,
            rationale: verdict.reasoning,
            target_query: message.to_string(),
        })
    }
}

fn build_prompt(message: &str, recent_history: &[Turn]) -> String {
    if recent_history.is_empty() {
        return message.to_string();
    }
    let mut context = String::from("Previous conversation:\n");
    for turn in recent_history {
        context.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    context.push_str(&format!("\nCurrent message: {message}"));
    context
}

/// Greeting phrases matched against the whole normalized message.
const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "hello how are you",
    "hi there",
    "hey there",
    "how are you",
    "good morning",
    "good afternoon",
    "good evening",
    "whats up",
];

/// Keywords that mark a message as out of domain when present as words.
const OFF_TOPIC_WORDS: &[&str] = &["joke", "riddle", "weather", "forecast"];

/// Phrase prefixes for code-writing requests.
const CODE_REQUEST_PREFIXES: &[&str] = &[
    "write a program",
    "write a script",
    "write a function",
    "write some code",
    "write me a program",
    "write me a script",
    "write me some code",
    "write code",
];

/// Detect obviously out-of-domain messages without a generation call.
///
/// Conservative on purpose: only exact greetings, isolated off-topic
/// keywords, and code-request prefixes match. Everything else is left to
/// the classifier so real inquiries ("my internet is not working") are
/// never swallowed here.
pub fn prefilter_unsupported(message: &str) -> Option<&'static str> {
    let normalized: String = message
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    if GREETINGS.contains(&normalized.as_str()) {
        return Some("greeting");
    }
    let words: Vec<&str> = normalized.split(' ').collect();
    for keyword in OFF_TOPIC_WORDS {
        if words.contains(keyword) {
            return Some("off-topic request");
        }
    }
    for prefix in CODE_REQUEST_PREFIXES {
        if normalized.starts_with(prefix) {
            return Some("code-writing request");
        }
    }
    None
}

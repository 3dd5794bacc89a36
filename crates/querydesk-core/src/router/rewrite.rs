//! Query rewrite analysis.
//!
//! Runs only on messages already classified as document searches.
//! Detects grammatical defects and proposes a corrected form; the
//! rewritten query is never used without the one-round-trip confirmation
//! handled by [`crate::router::confirm`]. The detection heuristic itself
//! is delegated to the generation capability, so it stays pluggable;
//! this module owns only the contract and the degradation path.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use querydesk_types::generation::GenerationRequest;
use querydesk_types::route::RewriteResult;
use querydesk_types::turn::RewriteProposal;

use crate::generation::parse::parse_json_payload;
use crate::generation::provider::GenerationProvider;

const REWRITE_SYSTEM_PROMPT: &str = r#"You are a search query analyzer. Given a document search query:

1. Ignore conversational filler ("I'm looking for", "please find", "sorry", "documents about") and extract the core topic as "clean_topic".
2. Check the topic for grammatical problems: wrong part-of-speech ("Africa people" should be "African people"), missing articles, malformed noun phrases, or broken word order ("documents machine learning Python" should be "Python machine learning documents").
3. If you correct anything, set "needs_confirmation" to true and explain the specific correction in "rewrite_reason". If the topic is already well-formed, "rewritten_query" must equal "clean_topic" and "needs_confirmation" must be false.

Return ONLY a JSON object in this exact format:
{"clean_topic": "...", "rewritten_query": "...", "needs_confirmation": true or false, "rewrite_reason": "..." or null}"#;

/// Raw analyzer verdict as returned by the generation capability.
#[derive(Debug, Deserialize)]
struct AnalyzerVerdict {
    clean_topic: String,
    rewritten_query: String,
    needs_confirmation: bool,
    rewrite_reason: Option<String>,
}

/// Detects grammatical defects in search queries and proposes rewrites.
pub struct RewriteAnalyzer<P: GenerationProvider> {
    provider: Arc<P>,
}

impl<P: GenerationProvider> RewriteAnalyzer<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Analyze a document-search query.
    ///
    /// Rewriting is best-effort: capability failure or an unparseable
    /// verdict degrades to `NoRewriteNeeded` with the locally cleaned
    /// query, so the search always proceeds.
    pub async fn analyze(&self, query: &str) -> RewriteResult {
        let request = GenerationRequest::new(REWRITE_SYSTEM_PROMPT, query);
        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "rewrite analysis unavailable, proceeding without it");
                return RewriteResult::NoRewriteNeeded {
                    clean_query: strip_filler(query),
                };
            }
        };

        let verdict: AnalyzerVerdict = match parse_json_payload(&response.text) {
            Ok(verdict) => verdict,
            Err(e) => {
                debug!(error = %e, "unparseable rewrite verdict, proceeding without it");
                return RewriteResult::NoRewriteNeeded {
                    clean_query: strip_filler(query),
                };
            }
        };

        let clean = non_empty_or(verdict.clean_topic, || strip_filler(query));
        if verdict.needs_confirmation && verdict.rewritten_query != clean {
            RewriteResult::RewriteProposed {
                proposal: RewriteProposal {
                    original_query: query.to_string(),
                    rewritten_query: verdict.rewritten_query,
                    reason: verdict
                        .rewrite_reason
                        .unwrap_or_else(|| "corrected phrasing".to_string()),
                },
            }
        } else {
            RewriteResult::NoRewriteNeeded { clean_query: clean }
        }
    }
}

fn non_empty_or(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.trim().is_empty() {
        fallback()
    } else {
        value
    }
}

/// Leading filler phrases stripped by the local normalizer. Longer
/// phrases first so prefixes strip greedily.
const FILLER_PREFIXES: &[&str] = &[
    "i am looking for documents about",
    "i'm looking for documents about",
    "i am looking for",
    "i'm looking for",
    "please help me find",
    "can you find me",
    "can you find",
    "please find",
    "find me",
    "search for",
    "looking for",
    "documents about",
    "documents on",
    "tell me about",
    "what is",
    "ooh",
    "sorry",
    "please",
];

/// Best-effort local cleaning of a query: strips leading filler phrases
/// and trailing punctuation.
///
/// Used as the fallback clean form when the analyzer is unavailable and
/// as the cleaned rendition of a rejected rewrite, so user-facing text
/// never echoes raw filler.
pub fn strip_filler(query: &str) -> String {
    let mut current = query.trim().to_string();
    loop {
        let lower = current.to_lowercase();
        let mut stripped = false;
        for prefix in FILLER_PREFIXES {
            if lower.starts_with(prefix) {
                let boundary_ok = lower[prefix.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric());
                if boundary_ok {
                    current = current[prefix.len()..]
                        .trim_start_matches([' ', ',', ':', '-'])
                        .to_string();
                    stripped = true;
                    break;
                }
            }
        }
        if !stripped {
            break;
        }
    }
    let cleaned = current.trim().trim_end_matches(['?', '!', '.']).trim();
    if cleaned.is_empty() {
        query.trim().to_string()
    } else {
        cleaned.to_string()
    }
}

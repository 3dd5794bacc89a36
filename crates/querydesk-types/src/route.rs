//! Route classification types.
//!
//! `QueryType` is the closed set of handling paths. Classification,
//! rewrite analysis, and confirmation resolution all communicate through
//! the tagged variants here so every dispatch site is exhaustively
//! checked at compile time.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::turn::RewriteProposal;

/// The handling path chosen for a user message.
///
/// `QueryConfirmation` is never produced by the classifier itself; it is
/// the route of a turn that proposed a rewrite and is waiting for the
/// user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    SqlQuery,
    DocumentSearch,
    CustomerService,
    ClarificationNeeded,
    QueryConfirmation,
    Unsupported,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::SqlQuery => write!(f, "sql_query"),
            QueryType::DocumentSearch => write!(f, "document_search"),
            QueryType::CustomerService => write!(f, "customer_service"),
            QueryType::ClarificationNeeded => write!(f, "clarification_needed"),
            QueryType::QueryConfirmation => write!(f, "query_confirmation"),
            QueryType::Unsupported => write!(f, "unsupported"),
        }
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql_query" => Ok(QueryType::SqlQuery),
            "document_search" => Ok(QueryType::DocumentSearch),
            "customer_service" => Ok(QueryType::CustomerService),
            "clarification_needed" => Ok(QueryType::ClarificationNeeded),
            "query_confirmation" => Ok(QueryType::QueryConfirmation),
            "unsupported" => Ok(QueryType::Unsupported),
            other => Err(format!("invalid query type: '{other}'")),
        }
    }
}

/// Classifier self-reported confidence, kept for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// The output of intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub query_type: QueryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// The string to actually use downstream: the original message, or a
    /// resolved rewritten query after confirmation.
    pub target_query: String,
}

/// Outcome of rewrite analysis for a document-search query.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteResult {
    /// Query is fine as-is; `clean_query` is a lightly normalized form
    /// (conversational filler stripped) safe for user-facing text.
    NoRewriteNeeded { clean_query: String },
    /// A correction was found; confirmation is required before the
    /// rewritten form may be used.
    RewriteProposed { proposal: RewriteProposal },
}

/// How a user reply resolves a pending rewrite proposal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    /// Affirmative reply: search with the corrected query.
    UseRewritten(String),
    /// Explicit "as-is" reply: search with the original wording.
    UseOriginal(String),
    /// Bare negative or unrecognized reply under a live proposal: ask
    /// the user to rephrase rather than guess.
    NeedsRephrase,
    /// The prior turn carried no live proposal; treat the reply as a
    /// fresh message.
    NotAPendingConfirmation,
}

/// Customer-service category, a closed set with one canned template each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerCategory {
    #[serde(rename = "Technical Support")]
    TechnicalSupport,
    #[serde(rename = "Billing")]
    Billing,
    #[serde(rename = "General Inquiry")]
    GeneralInquiry,
}

impl fmt::Display for CustomerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerCategory::TechnicalSupport => write!(f, "Technical Support"),
            CustomerCategory::Billing => write!(f, "Billing"),
            CustomerCategory::GeneralInquiry => write!(f, "General Inquiry"),
        }
    }
}

impl FromStr for CustomerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical support" => Ok(CustomerCategory::TechnicalSupport),
            "billing" => Ok(CustomerCategory::Billing),
            "general inquiry" => Ok(CustomerCategory::GeneralInquiry),
            other => Err(format!("invalid customer category: '{other}'")),
        }
    }
}

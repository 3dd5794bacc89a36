//! Routing core for Querydesk.
//!
//! Owns the stateful pipeline that classifies free-text messages,
//! proposes and confirms query rewrites across turns, and dispatches to
//! the type-specific branch pipelines. Collaborator boundaries
//! (generation, embeddings, turn store, document store, SQL execution)
//! are traits here; implementations live in querydesk-infra.

pub mod document;
pub mod embedding;
pub mod generation;
pub mod orchestrator;
pub mod pipeline;
pub mod router;
pub mod sqlexec;
pub mod sqlguard;
pub mod turn;

#[cfg(test)]
pub(crate) mod testkit;

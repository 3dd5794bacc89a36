//! Shared domain types for Querydesk.
//!
//! This crate holds the data shapes exchanged between the routing core,
//! the infrastructure layer, and the HTTP API: conversation turns, route
//! decisions, progress events, documents, generation capability types,
//! configuration, and error enums. It carries no business logic beyond
//! small conversions and display impls.

pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod generation;
pub mod route;
pub mod turn;

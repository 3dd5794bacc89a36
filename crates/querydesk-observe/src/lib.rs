//! Observability setup for Querydesk.
//!
//! Structured logging via `tracing` with an optional OpenTelemetry
//! bridge. Binaries call [`tracing_setup::init_tracing`] once at startup
//! and [`tracing_setup::shutdown_tracing`] before exit.

pub mod tracing_setup;

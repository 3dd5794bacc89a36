//! SqlExecutor trait definition.
//!
//! Read-only row access for the SQL branch. The executor receives
//! statements that already passed [`crate::sqlguard`] validation but
//! still contain the `$user_id` placeholder; it binds the real user id
//! as a parameter so user-supplied text never reaches the statement.

use querydesk_types::error::RepositoryError;

/// One result row as a JSON object (column name -> value).
pub type SqlRow = serde_json::Map<String, serde_json::Value>;

/// Trait for executing validated read-only selections.
///
/// Implementations live in querydesk-infra (e.g., `SqliteSqlExecutor`).
pub trait SqlExecutor: Send + Sync {
    /// Execute a validated SELECT, binding `user_id` for every
    /// `$user_id` placeholder and capping the result at `max_rows`.
    fn execute_select(
        &self,
        sql: &str,
        user_id: &str,
        max_rows: usize,
    ) -> impl std::future::Future<Output = Result<Vec<SqlRow>, RepositoryError>> + Send;
}

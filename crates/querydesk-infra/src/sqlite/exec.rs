//! SQLite executor for the SQL branch.
//!
//! Receives statements that already passed the safety check but still
//! carry the `$user_id` placeholder. Every placeholder occurrence is
//! replaced with a bind parameter and the real user id is bound for
//! each, so user-supplied text never becomes part of the statement. The
//! row cap is applied here rather than trusted to generation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use querydesk_core::sqlexec::{SqlExecutor, SqlRow};
use querydesk_core::sqlguard::USER_ID_PLACEHOLDER;
use querydesk_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SqlExecutor`.
pub struct SqliteSqlExecutor {
    pool: DatabasePool,
}

impl SqliteSqlExecutor {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Replace each `$user_id` occurrence (quoted or bare) with a bind
/// parameter, returning the rewritten statement and the bind count.
fn bind_user_placeholder(sql: &str) -> (String, usize) {
    let quoted = format!("'{USER_ID_PLACEHOLDER}'");
    let mut statement = sql.replace(&quoted, "?");
    let mut count = sql.matches(&quoted).count();

    let bare_count = statement.matches(USER_ID_PLACEHOLDER).count();
    statement = statement.replace(USER_ID_PLACEHOLDER, "?");
    count += bare_count;

    (statement, count)
}

/// Decode a result cell to JSON by its runtime storage class.
fn value_at(row: &SqliteRow, index: usize) -> serde_json::Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return serde_json::Value::Null;
    };
    if raw.is_null() {
        return serde_json::Value::Null;
    }
    match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(index)
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
    }
}

fn row_to_json(row: &SqliteRow) -> SqlRow {
    let mut map = serde_json::Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), value_at(row, index));
    }
    map
}

impl SqlExecutor for SqliteSqlExecutor {
    async fn execute_select(
        &self,
        sql: &str,
        user_id: &str,
        max_rows: usize,
    ) -> Result<Vec<SqlRow>, RepositoryError> {
        let (statement, binds) = bind_user_placeholder(sql);

        let mut query = sqlx::query(&statement);
        for _ in 0..binds {
            query = query.bind(user_id);
        }

        let mut rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        rows.truncate(max_rows);

        Ok(rows.iter().map(row_to_json).collect())
    }
}

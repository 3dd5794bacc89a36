//! SQL branch pipeline: generate, validate, execute, format.
//!
//! The generated statement must reference the caller through the
//! `$user_id` placeholder; the executor binds the real id as a
//! parameter, so user-supplied text never reaches the statement. The
//! [`crate::sqlguard`] check runs before execution and short-circuits
//! the branch on any violation.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use querydesk_types::config::RouterConfig;
use querydesk_types::error::ChatError;
use querydesk_types::event::{EventType, FinalResponse};
use querydesk_types::generation::GenerationRequest;

use crate::generation::parse::parse_json_payload;
use crate::generation::provider::GenerationProvider;
use crate::pipeline::EventSink;
use crate::sqlexec::{SqlExecutor, SqlRow};
use crate::sqlguard::validate_generated_sql;

const SQL_GENERATOR_SYSTEM_PROMPT: &str = r#"You are an expert SQL query generator. Convert the user's natural language question into a single SQLite SELECT query.

DATABASE SCHEMA:
Table: orders
- id (INTEGER PRIMARY KEY)
- user_id (TEXT NOT NULL)
- product_name (TEXT NOT NULL)
- quantity (INTEGER NOT NULL)
- price (REAL NOT NULL)
- order_date (TEXT, ISO-8601)
- status (TEXT) - values: 'pending', 'shipped', 'delivered'
- created_at (TEXT, ISO-8601)

RULES:
1. ONLY generate SELECT queries - never INSERT, UPDATE, DELETE, DROP
2. Always filter by user_id using the literal "$user_id" placeholder
3. Use appropriate aggregation functions (COUNT, SUM, AVG, MAX, MIN)
4. Add ORDER BY when showing lists
5. Keep queries simple and efficient

Return ONLY a JSON object in this exact format:
{"sql_query": "SELECT ... FROM orders WHERE user_id = '$user_id' ...", "explanation": "brief explanation"}"#;

const RESULT_FORMATTER_SYSTEM_PROMPT: &str = r#"You are a data presentation specialist. Convert raw SQL query results into a clear, conversational answer to the user's original question.

- Include specific numbers, names, and details from the results
- If results are empty, say so clearly
- For counts and aggregations, use simple language

Return ONLY a JSON object in this exact format:
{"natural_language_answer": "conversational answer", "summary": "one-sentence summary"}"#;

#[derive(Debug, Deserialize)]
struct GeneratedSql {
    sql_query: String,
    #[allow(dead_code)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormattedAnswer {
    natural_language_answer: String,
}

/// Answers questions about the caller's own transactional data.
pub struct SqlPipeline<P: GenerationProvider, S: SqlExecutor> {
    provider: Arc<P>,
    executor: Arc<S>,
    config: Arc<RouterConfig>,
}

impl<P: GenerationProvider, S: SqlExecutor> SqlPipeline<P, S> {
    pub fn new(provider: Arc<P>, executor: Arc<S>, config: Arc<RouterConfig>) -> Self {
        Self {
            provider,
            executor,
            config,
        }
    }

    pub async fn run(
        &self,
        question: &str,
        user_id: &str,
        sink: &EventSink,
    ) -> Result<FinalResponse, ChatError> {
        sink.emit(EventType::SqlGenerating, "Generating a query for your question")
            .await;
        let request = GenerationRequest::new(SQL_GENERATOR_SYSTEM_PROMPT, question);
        let response = self.provider.complete(&request).await?;
        let generated: GeneratedSql = parse_json_payload(&response.text)?;
        let sql = generated.sql_query.trim().to_string();

        sink.emit(EventType::SqlValidating, "Checking the query against safety rules")
            .await;
        validate_generated_sql(&sql, &self.config.allowed_tables)?;

        sink.emit(EventType::SqlExecuting, "Running the query").await;
        let rows = self
            .executor
            .execute_select(&sql, user_id, self.config.max_sql_rows)
            .await
            .map_err(|e| ChatError::RetrievalFailure(e.to_string()))?;
        info!(rows = rows.len(), "sql branch returned rows");

        sink.emit(EventType::Formatting, "Formatting the results").await;
        let answer = self.format_answer(question, &sql, &rows).await?;

        Ok(FinalResponse::SqlQuery {
            original_question: question.to_string(),
            generated_sql: sql,
            query_results: rows.into_iter().map(serde_json::Value::Object).collect(),
            natural_language_answer: answer,
        })
    }

    async fn format_answer(
        &self,
        question: &str,
        sql: &str,
        rows: &[SqlRow],
    ) -> Result<String, ChatError> {
        let results_json = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            "Original question: {question}\nExecuted query: {sql}\nQuery results: {results_json}"
        );
        let request = GenerationRequest::new(RESULT_FORMATTER_SYSTEM_PROMPT, prompt);
        let response = self.provider.complete(&request).await?;
        let formatted: FormattedAnswer = parse_json_payload(&response.text)?;
        Ok(formatted.natural_language_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{sql_row, ScriptedProvider, ScriptedSqlExecutor};
    use querydesk_types::event::ProgressEvent;
    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn pipeline(
        provider: ScriptedProvider,
        executor: ScriptedSqlExecutor,
    ) -> SqlPipeline<ScriptedProvider, ScriptedSqlExecutor> {
        SqlPipeline::new(
            Arc::new(provider),
            Arc::new(executor),
            Arc::new(RouterConfig::default()),
        )
    }

    fn sink() -> (EventSink, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (EventSink::new(tx, Uuid::now_v7()), rx)
    }

    fn drain(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<EventType> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type);
        }
        kinds
    }

    #[tokio::test]
    async fn test_count_query_flows_through() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"sql_query": "SELECT COUNT(*) AS order_count FROM orders WHERE user_id = '$user_id'", "explanation": "counts orders"}"#,
            r#"{"natural_language_answer": "You have 3 orders.", "summary": "3 orders"}"#,
        ]);
        let executor = ScriptedSqlExecutor::with_rows(vec![sql_row(&[("order_count", json!(3))])]);
        let p = pipeline(provider, executor);
        let (sink, rx) = sink();

        let response = p
            .run("How many orders do I have?", "u1", &sink)
            .await
            .unwrap();
        match response {
            FinalResponse::SqlQuery {
                original_question,
                generated_sql,
                query_results,
                natural_language_answer,
            } => {
                assert_eq!(original_question, "How many orders do I have?");
                assert!(generated_sql.contains("$user_id"));
                assert_eq!(query_results.len(), 1);
                assert!(natural_language_answer.contains('3'));
            }
            other => panic!("expected sql response, got {other:?}"),
        }

        assert_eq!(
            drain(rx),
            vec![
                EventType::SqlGenerating,
                EventType::SqlValidating,
                EventType::SqlExecuting,
                EventType::Formatting,
            ]
        );
    }

    #[tokio::test]
    async fn test_executor_receives_placeholder_and_user() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"sql_query": "SELECT id FROM orders WHERE user_id = '$user_id'", "explanation": null}"#,
            r#"{"natural_language_answer": "No orders.", "summary": "none"}"#,
        ]);
        let executor = ScriptedSqlExecutor::with_rows(vec![]);
        let executor = Arc::new(executor);
        let p = SqlPipeline::new(
            Arc::new(provider),
            executor.clone(),
            Arc::new(RouterConfig::default()),
        );
        let (sink, _rx) = sink();

        p.run("Show my orders", "u42", &sink).await.unwrap();

        let executed = executor.executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].0.contains("$user_id"));
        assert_eq!(executed[0].1, "u42");
    }

    #[tokio::test]
    async fn test_unsafe_statement_short_circuits_before_execution() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"sql_query": "DELETE FROM orders WHERE user_id = '$user_id'", "explanation": null}"#,
        ]);
        let executor = Arc::new(ScriptedSqlExecutor::with_rows(vec![]));
        let p = SqlPipeline::new(
            Arc::new(provider),
            executor.clone(),
            Arc::new(RouterConfig::default()),
        );
        let (sink, rx) = sink();

        let result = p.run("Delete everything", "u1", &sink).await;
        assert!(matches!(result, Err(ChatError::UnsafeQuery(_))));
        assert!(executor.executed().is_empty(), "must never reach the database");
        // The branch stopped at validation.
        assert_eq!(drain(rx), vec![EventType::SqlGenerating, EventType::SqlValidating]);
    }

    #[tokio::test]
    async fn test_out_of_allowlist_table_rejected() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"sql_query": "SELECT * FROM users WHERE user_id = '$user_id'", "explanation": null}"#,
        ]);
        let executor = Arc::new(ScriptedSqlExecutor::with_rows(vec![]));
        let p = SqlPipeline::new(
            Arc::new(provider),
            executor.clone(),
            Arc::new(RouterConfig::default()),
        );
        let (sink, _rx) = sink();

        let result = p.run("Show all users", "u1", &sink).await;
        assert!(matches!(result, Err(ChatError::UnsafeQuery(_))));
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_retrieval_failure() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"sql_query": "SELECT id FROM orders WHERE user_id = '$user_id'", "explanation": null}"#,
        ]);
        let p = pipeline(provider, ScriptedSqlExecutor::failing());
        let (sink, _rx) = sink();

        let result = p.run("Show my orders", "u1", &sink).await;
        assert!(matches!(result, Err(ChatError::RetrievalFailure(_))));
    }

    #[tokio::test]
    async fn test_unparseable_generation_is_generation_error() {
        let provider = ScriptedProvider::with_responses(vec!["not json"]);
        let p = pipeline(provider, ScriptedSqlExecutor::with_rows(vec![]));
        let (sink, _rx) = sink();

        let result = p.run("How many orders?", "u1", &sink).await;
        assert!(matches!(result, Err(ChatError::Generation(_))));
    }
}

//! Safety validation for generated SQL.
//!
//! Generated statements must pass here before they get anywhere near
//! the database: single read-only SELECT, allow-listed tables only, and
//! a `$user_id` scope predicate. Violations raise `UnsafeQuery` and
//! short-circuit the branch; the database is never relied on to reject
//! anything.

use querydesk_types::error::ChatError;

/// Keywords that disqualify a statement outright, checked as standalone
/// words after comment stripping.
const BLOCKED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
    "EXECUTE", "EXEC", "INTO", "SET", "MERGE", "REPLACE", "ATTACH", "DETACH", "PRAGMA", "VACUUM",
];

/// The placeholder generated SQL must use to scope rows to the caller.
pub const USER_ID_PLACEHOLDER: &str = "$user_id";

/// Validate a generated statement against the safety rules.
///
/// Checks, in order: single statement, SELECT-only, no blocked
/// keywords, all referenced tables allow-listed, and the `$user_id`
/// scope predicate present. The error message names the first rule
/// violated.
pub fn validate_generated_sql(sql: &str, allowed_tables: &[String]) -> Result<(), ChatError> {
    let stripped = strip_comments(sql);
    let trimmed = stripped.trim().trim_end_matches(';').trim();

    if trimmed.is_empty() {
        return Err(ChatError::UnsafeQuery("empty statement".to_string()));
    }
    if trimmed.contains(';') {
        return Err(ChatError::UnsafeQuery(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let upper = trimmed.to_uppercase();
    if !upper.starts_with("SELECT") {
        return Err(ChatError::UnsafeQuery(
            "only SELECT statements are allowed".to_string(),
        ));
    }

    let words: Vec<String> = tokenize_words(&upper);
    for keyword in BLOCKED_KEYWORDS {
        if words.iter().any(|w| w == keyword) {
            return Err(ChatError::UnsafeQuery(format!(
                "blocked keyword: {keyword}"
            )));
        }
    }

    let referenced = referenced_tables(&words);
    if referenced.is_empty() {
        return Err(ChatError::UnsafeQuery(
            "no table referenced".to_string(),
        ));
    }
    for table in &referenced {
        let allowed = allowed_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table));
        if !allowed {
            return Err(ChatError::UnsafeQuery(format!(
                "table '{}' is not allow-listed",
                table.to_lowercase()
            )));
        }
    }

    if !trimmed.contains(USER_ID_PLACEHOLDER) {
        return Err(ChatError::UnsafeQuery(
            "missing user scope predicate".to_string(),
        ));
    }
    if !words.iter().any(|w| w == "USER_ID") {
        return Err(ChatError::UnsafeQuery(
            "missing user_id filter column".to_string(),
        ));
    }

    Ok(())
}

/// Remove `-- line` and `/* block */` comments.
///
/// Comments are stripped before validation so a blocked keyword cannot
/// hide behind one, and so commented-out text cannot trip the checks.
fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' && chars.peek() == Some(&'-') {
            for c2 in chars.by_ref() {
                if c2 == '\n' {
                    out.push('\n');
                    break;
                }
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = ' ';
            for c2 in chars.by_ref() {
                if prev == '*' && c2 == '/' {
                    break;
                }
                prev = c2;
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Split into identifier-ish words (alphanumeric + underscore runs).
fn tokenize_words(sql: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in sql.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Identifiers appearing immediately after FROM or JOIN.
fn referenced_tables(words: &[String]) -> Vec<String> {
    let mut tables = Vec::new();
    for (i, word) in words.iter().enumerate() {
        if word == "FROM" || word == "JOIN" {
            // A parenthesized subselect puts SELECT right after FROM.
            if let Some(next) = words.get(i + 1) {
                if next != "SELECT" {
                    tables.push(next.clone());
                }
            }
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["orders".to_string()]
    }

    #[test]
    fn test_valid_count_query() {
        let sql = "SELECT COUNT(*) AS order_count FROM orders WHERE user_id = '$user_id'";
        assert!(validate_generated_sql(sql, &allowed()).is_ok());
    }

    #[test]
    fn test_valid_with_trailing_semicolon() {
        let sql = "SELECT id FROM orders WHERE user_id = '$user_id';";
        assert!(validate_generated_sql(sql, &allowed()).is_ok());
    }

    #[test]
    fn test_rejects_delete() {
        let sql = "DELETE FROM orders WHERE user_id = '$user_id'";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(matches!(err, ChatError::UnsafeQuery(_)));
    }

    #[test]
    fn test_rejects_blocked_keyword_inside_select() {
        let sql = "SELECT id FROM orders WHERE user_id = '$user_id' UNION SELECT 1 INTO x";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(err.to_string().contains("INTO"));
    }

    #[test]
    fn test_rejects_multiple_statements() {
        let sql = "SELECT id FROM orders WHERE user_id = '$user_id'; DROP TABLE orders";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(matches!(err, ChatError::UnsafeQuery(_)));
    }

    #[test]
    fn test_rejects_unlisted_table() {
        let sql = "SELECT * FROM accounts WHERE user_id = '$user_id'";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(err.to_string().contains("accounts"));
    }

    #[test]
    fn test_rejects_join_to_unlisted_table() {
        let sql = "SELECT o.id FROM orders o JOIN accounts a ON a.id = o.id \
                   WHERE o.user_id = '$user_id'";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(err.to_string().contains("accounts"));
    }

    #[test]
    fn test_rejects_missing_user_scope() {
        let sql = "SELECT COUNT(*) FROM orders";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(err.to_string().contains("user scope"));
    }

    #[test]
    fn test_rejects_literal_user_id_without_placeholder() {
        // A hard-coded id is not a valid scope predicate: the id must be
        // bound by the executor, never taken from generated text.
        let sql = "SELECT COUNT(*) FROM orders WHERE user_id = 'u1'";
        let err = validate_generated_sql(sql, &allowed()).unwrap_err();
        assert!(matches!(err, ChatError::UnsafeQuery(_)));
    }

    #[test]
    fn test_rejects_keyword_hidden_behind_comment_removal() {
        let sql = "SELECT id FROM orders WHERE user_id = '$user_id' /* x */ ; DROP TABLE orders";
        assert!(validate_generated_sql(sql, &allowed()).is_err());
    }

    #[test]
    fn test_comments_do_not_trip_validation() {
        let sql = "SELECT id -- the order id\nFROM orders WHERE user_id = '$user_id'";
        assert!(validate_generated_sql(sql, &allowed()).is_ok());
    }

    #[test]
    fn test_rejects_pragma() {
        let err = validate_generated_sql("PRAGMA table_info(orders)", &allowed()).unwrap_err();
        assert!(matches!(err, ChatError::UnsafeQuery(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(validate_generated_sql("   ", &allowed()).is_err());
    }

    #[test]
    fn test_case_insensitive_table_match() {
        let sql = "select count(*) from ORDERS where user_id = '$user_id'";
        assert!(validate_generated_sql(sql, &allowed()).is_ok());
    }

    #[test]
    fn test_tokenize_words() {
        let words = tokenize_words("SELECT COUNT(*) FROM orders WHERE user_id='$user_id'");
        assert!(words.contains(&"FROM".to_string()));
        assert!(words.contains(&"user_id".to_string()));
    }

    #[test]
    fn test_referenced_tables_skips_subselect() {
        let words = tokenize_words(
            &"SELECT * FROM (SELECT id FROM orders) WHERE user_id = '$user_id'".to_uppercase(),
        );
        let tables = referenced_tables(&words);
        assert_eq!(tables, vec!["ORDERS".to_string()]);
    }
}

//! Secure query engine.
//!
//! The only path by which caller-supplied query text reaches the database.
//! Every gate here is load-bearing: the caller is an LLM agent and the text
//! it sends is untrusted.

use crate::dialect::Dialect;
use crate::source::QueryExecutor;
use regex::Regex;
use sqlens_core::error::ToolError;
use sqlens_core::types::QueryResult;
use std::sync::{Arc, LazyLock};

/// Anchored at the start, leading whitespace allowed.
static SELECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*SELECT\s").expect("static regex")
});

/// Whole-word match anywhere in the text, which also catches statements
/// chained after a semicolon.
static FORBIDDEN_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(DROP|DELETE|UPDATE|INSERT|CREATE|ALTER|TRUNCATE|EXEC|EXECUTE|GRANT|REVOKE)\b")
        .expect("static regex")
});

/// Validates and executes SELECT-only queries with a hard row cap.
pub struct SecureQueryEngine {
    executor: Arc<dyn QueryExecutor>,
    dialect: Dialect,
    max_rows: u32,
    log_queries: bool,
}

impl SecureQueryEngine {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        dialect: Dialect,
        max_rows: u32,
        log_queries: bool,
    ) -> Self {
        Self {
            executor,
            dialect,
            max_rows,
            log_queries,
        }
    }

    /// Run the three validation gates without executing anything.
    pub fn validate(&self, query_text: &str) -> bool {
        let trimmed = query_text.trim();
        !trimmed.is_empty()
            && SELECT_PATTERN.is_match(trimmed)
            && !FORBIDDEN_KEYWORDS.is_match(trimmed)
    }

    /// Validate, cap and execute `query_text`.
    ///
    /// The returned [`QueryResult`] carries the trimmed original text, not
    /// the limit-augmented statement that actually ran.
    pub async fn execute(
        &self,
        query_text: &str,
        max_rows: Option<i64>,
    ) -> Result<QueryResult, ToolError> {
        let trimmed = query_text.trim();
        if trimmed.is_empty() {
            return Err(ToolError::validation("Query description cannot be empty"));
        }

        if !SELECT_PATTERN.is_match(trimmed) {
            tracing::error!(query = trimmed, "rejected non-SELECT query");
            return Err(ToolError::security(
                "Only SELECT queries are allowed. Query must start with SELECT.",
            ));
        }

        if let Some(m) = FORBIDDEN_KEYWORDS.find(trimmed) {
            tracing::error!(query = trimmed, keyword = m.as_str(), "rejected forbidden keyword");
            return Err(ToolError::security(format!(
                "Query contains forbidden keyword: {}",
                m.as_str().to_uppercase()
            )));
        }

        // clamp before narrowing so an oversized caller cap cannot wrap
        let effective_cap = match max_rows {
            Some(n) if n > 0 => n.min(i64::from(self.max_rows)) as u32,
            _ => self.max_rows,
        };

        let limited = self.apply_row_limit(trimmed, effective_cap);

        if self.log_queries {
            tracing::info!(max_rows = effective_cap, query = %limited, "executing query");
        }

        let rows = self
            .executor
            .fetch_all(&limited)
            .await
            .map_err(|e| ToolError::execution(format!("Query execution failed: {e}")))?;

        let column_names: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        tracing::info!(rows = rows.len(), "query executed");

        Ok(QueryResult {
            query: trimmed.to_string(),
            row_count: rows.len(),
            row_limit: effective_cap,
            column_names,
            rows,
        })
    }

    /// Leave the text alone if it already carries a row-limiting clause,
    /// otherwise render one for the active dialect.
    fn apply_row_limit(&self, query: &str, max_rows: u32) -> String {
        let upper = query.to_uppercase();
        if upper.contains(" LIMIT ") || upper.contains(" FETCH ") || upper.contains(" TOP ") {
            return query.to_string();
        }
        self.dialect.render_limit(query, max_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceError, SourceResult};
    use async_trait::async_trait;
    use serde_json::json;
    use sqlens_core::types::Row;
    use std::sync::Mutex;

    /// Records the SQL it is handed and plays back canned rows.
    struct FakeExecutor {
        rows: Vec<Row>,
        last_sql: Mutex<Option<String>>,
    }

    impl FakeExecutor {
        fn new(rows: Vec<Row>) -> Self {
            Self {
                rows,
                last_sql: Mutex::new(None),
            }
        }

        fn executed(&self) -> String {
            self.last_sql.lock().unwrap().clone().unwrap_or_default()
        }
    }

    #[async_trait]
    impl QueryExecutor for FakeExecutor {
        async fn fetch_all(&self, sql: &str) -> SourceResult<Vec<Row>> {
            *self.last_sql.lock().unwrap() = Some(sql.to_string());
            Ok(self.rows.clone())
        }

        async fn fetch_with_param(&self, _sql: &str, _param: &str) -> SourceResult<Vec<Row>> {
            Err(SourceError::Database("not used".to_string()))
        }
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        let mut row = Row::new();
        for (key, value) in pairs {
            row.insert(key.to_string(), value.clone());
        }
        row
    }

    fn engine_with(executor: Arc<FakeExecutor>) -> SecureQueryEngine {
        SecureQueryEngine::new(executor, Dialect::Postgres, 1000, false)
    }

    #[tokio::test]
    async fn rejects_empty_query() {
        let engine = engine_with(Arc::new(FakeExecutor::new(vec![])));
        let err = engine.execute("   ", None).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_non_select() {
        let engine = engine_with(Arc::new(FakeExecutor::new(vec![])));
        let err = engine.execute("SHOW TABLES", None).await.unwrap_err();
        assert!(matches!(err, ToolError::Security(_)));
    }

    #[tokio::test]
    async fn rejects_stacked_statement() {
        let engine = engine_with(Arc::new(FakeExecutor::new(vec![])));
        let err = engine
            .execute("SELECT 1; DROP TABLE customers", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Security(_)));
    }

    #[tokio::test]
    async fn rejects_forbidden_keyword_case_insensitive() {
        let engine = engine_with(Arc::new(FakeExecutor::new(vec![])));
        let err = engine
            .execute("select * from t where x = 1 and TrUnCaTe", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Security(_)));
    }

    #[tokio::test]
    async fn allows_keyword_as_substring() {
        // "created_at" contains CREATE but not as a whole word.
        let executor = Arc::new(FakeExecutor::new(vec![]));
        let engine = engine_with(executor.clone());
        let result = engine
            .execute("SELECT created_at FROM orders", None)
            .await
            .unwrap();
        assert_eq!(result.row_count, 0);
    }

    #[tokio::test]
    async fn appends_dialect_limit() {
        let executor = Arc::new(FakeExecutor::new(vec![]));
        let engine = engine_with(executor.clone());
        engine.execute("SELECT id FROM users", None).await.unwrap();
        assert_eq!(executor.executed(), "SELECT id FROM users LIMIT 1000");
    }

    #[tokio::test]
    async fn keeps_existing_limit_clause() {
        let executor = Arc::new(FakeExecutor::new(vec![]));
        let engine = engine_with(executor.clone());
        let result = engine
            .execute("SELECT id FROM users LIMIT 5", None)
            .await
            .unwrap();
        assert_eq!(executor.executed(), "SELECT id FROM users LIMIT 5");
        // the reported query is the trimmed input, untouched
        assert_eq!(result.query, "SELECT id FROM users LIMIT 5");
    }

    #[tokio::test]
    async fn caller_cap_is_clamped_to_configured_max() {
        let executor = Arc::new(FakeExecutor::new(vec![]));
        let engine = SecureQueryEngine::new(executor.clone(), Dialect::Postgres, 100, false);

        let result = engine
            .execute("SELECT id FROM users", Some(5000))
            .await
            .unwrap();
        assert_eq!(result.row_limit, 100);

        let result = engine
            .execute("SELECT id FROM users", Some(10))
            .await
            .unwrap();
        assert_eq!(result.row_limit, 10);

        // non-positive caller values fall back to the configured max
        let result = engine
            .execute("SELECT id FROM users", Some(-1))
            .await
            .unwrap();
        assert_eq!(result.row_limit, 100);
    }

    #[tokio::test]
    async fn caller_cap_beyond_u32_clamps_to_configured_max() {
        let executor = Arc::new(FakeExecutor::new(vec![]));
        let engine = SecureQueryEngine::new(executor.clone(), Dialect::Postgres, 1000, false);

        // 2^32 + 1 must not wrap to 1 when narrowing
        let result = engine
            .execute("SELECT id FROM users", Some(4_294_967_297))
            .await
            .unwrap();
        assert_eq!(result.row_limit, 1000);
        assert_eq!(executor.executed(), "SELECT id FROM users LIMIT 1000");
    }

    #[tokio::test]
    async fn column_names_come_from_first_row() {
        let rows = vec![
            row(&[("id", json!(1)), ("name", json!("ada"))]),
            row(&[("id", json!(2)), ("name", json!("grace"))]),
        ];
        let engine = engine_with(Arc::new(FakeExecutor::new(rows)));
        let result = engine.execute("SELECT id, name FROM users", None).await.unwrap();
        assert_eq!(result.column_names, vec!["id", "name"]);
        assert_eq!(result.row_count, 2);
    }

    #[test]
    fn validate_matches_execute_gates() {
        let engine = engine_with(Arc::new(FakeExecutor::new(vec![])));
        assert!(engine.validate("SELECT 1"));
        assert!(engine.validate("  select *\nfrom t"));
        assert!(!engine.validate(""));
        assert!(!engine.validate("UPDATE t SET x = 1"));
        assert!(!engine.validate("SELECT 1; GRANT ALL ON t TO public"));
    }
}

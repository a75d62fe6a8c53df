//! The data-source seam.
//!
//! The query engine and introspector depend on these traits, never on a
//! concrete driver. [`crate::AnySource`] is the production implementation;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use sqlens_core::error::ToolError;
use sqlens_core::types::Row;
use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised by a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unsupported database product: {0}")]
    Unsupported(String),
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<SourceError> for ToolError {
    fn from(err: SourceError) -> Self {
        ToolError::Execution(err.to_string())
    }
}

/// Parameterless and single-parameter SELECT execution, rows streamed back
/// as ordered column-to-value maps.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_all(&self, sql: &str) -> SourceResult<Vec<Row>>;

    /// Run a catalog query with one bound string parameter. The caller
    /// renders the placeholder through [`crate::Dialect::placeholder`].
    async fn fetch_with_param(&self, sql: &str, param: &str) -> SourceResult<Vec<Row>>;
}

/// Catalog-metadata capability: everything the introspector needs, already
/// separated from data-row access.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Product name as the database reports it (e.g. "PostgreSQL 16.1").
    async fn product_name(&self) -> SourceResult<String>;

    /// Name of the connected catalog/database, when the product exposes one.
    async fn current_database(&self) -> SourceResult<Option<String>>;

    /// All tables and views visible in the active schema.
    async fn list_relations(&self) -> SourceResult<Vec<RelationEntry>>;

    async fn list_columns(&self, table: &str) -> SourceResult<Vec<CatalogColumn>>;

    async fn primary_keys(&self, table: &str) -> SourceResult<Vec<String>>;

    async fn indexes(&self, table: &str) -> SourceResult<Vec<CatalogIndex>>;

    /// Foreign keys imported by `table`, rules as raw catalog strings.
    async fn imported_keys(&self, table: &str) -> SourceResult<Vec<CatalogForeignKey>>;

    async fn table_constraints(&self, table: &str) -> SourceResult<Vec<CatalogConstraint>>;
}

/// A table or view as listed by the catalog.
#[derive(Debug, Clone)]
pub struct RelationEntry {
    pub name: String,
    /// Raw catalog type, e.g. "BASE TABLE" or "VIEW".
    pub relation_type: String,
}

#[derive(Debug, Clone)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
    pub size: Option<i64>,
    pub decimal_digits: Option<i64>,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub auto_increment: bool,
}

/// One indexed column. `name` is `None` for statistics entries that do not
/// belong to a named index.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    pub name: Option<String>,
    pub unique: bool,
    pub column: String,
    pub ordinal_position: i64,
}

#[derive(Debug, Clone)]
pub struct CatalogForeignKey {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone)]
pub struct CatalogConstraint {
    pub name: String,
    pub constraint_type: String,
    pub column: Option<String>,
}

/// Normalize a referential-action rule from whatever the catalog returned
/// into the symbolic names callers expect.
pub fn normalize_rule(raw: &str) -> String {
    match raw.trim().to_uppercase().as_str() {
        "CASCADE" => "CASCADE".to_string(),
        "RESTRICT" => "RESTRICT".to_string(),
        "SET NULL" => "SET NULL".to_string(),
        "SET DEFAULT" => "SET DEFAULT".to_string(),
        "NO ACTION" => "NO ACTION".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}

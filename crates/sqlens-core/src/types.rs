//! Result types returned by the introspection and query tools.
//!
//! These serialize with camelCase field names, which is the wire shape the
//! LLM caller sees inside `tools/call` content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: column name to value, in result-set order.
pub type Row = serde_json::Map<String, Value>;

/// Result of a secure query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// The query as submitted (trimmed), without the injected row limit.
    pub query: String,
    pub row_count: usize,
    /// The effective cap that was applied.
    pub row_limit: u32,
    /// Derived from the first row's keys; empty when no rows came back.
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
}

/// Full schema overview: every visible table and view with its columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaStructure {
    pub database_name: String,
    pub database_type: String,
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub table_name: String,
    pub table_type: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub column_size: Option<i64>,
    pub nullable: bool,
    pub is_primary_key: bool,
}

/// Detailed description of a single table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    pub table_name: String,
    pub table_type: String,
    pub columns: Vec<ColumnDetail>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub constraints: Vec<ConstraintInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetail {
    pub column_name: String,
    pub data_type: String,
    pub column_size: Option<i64>,
    pub decimal_digits: Option<i64>,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
}

/// One entry per indexed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub index_name: String,
    pub unique: bool,
    pub column_name: String,
    pub ordinal_position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub fk_name: String,
    pub fk_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// CASCADE, RESTRICT, SET NULL, SET DEFAULT, NO ACTION or UNKNOWN.
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintInfo {
    pub constraint_name: String,
    pub constraint_type: String,
    pub column_name: Option<String>,
}

/// Triggers defined on a table, normalized across dialects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerList {
    pub table_name: String,
    pub triggers: Vec<TriggerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerInfo {
    pub trigger_name: String,
    pub event: String,
    pub timing: String,
    pub statement: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_result_serializes_camel_case() {
        let result = QueryResult {
            query: "SELECT id FROM users".to_string(),
            row_count: 1,
            row_limit: 1000,
            column_names: vec!["id".to_string()],
            rows: vec![{
                let mut row = Row::new();
                row.insert("id".to_string(), json!(7));
                row
            }],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["rowCount"], json!(1));
        assert_eq!(value["rowLimit"], json!(1000));
        assert_eq!(value["columnNames"], json!(["id"]));
    }

    #[test]
    fn row_preserves_insertion_order() {
        let mut row = Row::new();
        row.insert("zulu".to_string(), json!(1));
        row.insert("alpha".to_string(), json!(2));

        let keys: Vec<_> = row.keys().cloned().collect();
        assert_eq!(keys, vec!["zulu", "alpha"]);
    }
}

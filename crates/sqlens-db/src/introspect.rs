//! Catalog introspection.
//!
//! Three read operations over the catalog capability, each normalizing
//! per-dialect catalog output into one response shape. Results are cached
//! by input key; the second element of each return value says whether the
//! cache served the call.

use crate::cache::MetadataCache;
use crate::dialect::Dialect;
use crate::source::{normalize_rule, CatalogReader, QueryExecutor};
use serde_json::Value;
use sqlens_core::error::ToolError;
use sqlens_core::types::{
    ColumnDetail, ColumnInfo, ConstraintInfo, ForeignKeyInfo, IndexInfo, Row, SchemaStructure,
    TableDetails, TableInfo, TriggerInfo, TriggerList,
};
use std::collections::HashSet;
use std::sync::Arc;

pub struct Introspector {
    catalog: Arc<dyn CatalogReader>,
    executor: Arc<dyn QueryExecutor>,
    cache: Arc<MetadataCache>,
}

impl Introspector {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        executor: Arc<dyn QueryExecutor>,
        cache: Arc<MetadataCache>,
    ) -> Self {
        Self {
            catalog,
            executor,
            cache,
        }
    }

    /// Every table and view in the active schema, with columns and
    /// primary-key flags.
    pub async fn schema_structure(
        &self,
        database_name: &str,
    ) -> Result<(SchemaStructure, bool), ToolError> {
        if let Some(cached) = self.cache.schemas.get(database_name) {
            return Ok((cached, true));
        }

        let database_type = self.catalog.product_name().await?;
        let resolved_name = self
            .catalog
            .current_database()
            .await?
            .unwrap_or_else(|| database_name.to_string());

        tracing::info!(database = %resolved_name, product = %database_type, "introspecting schema");

        let mut tables = Vec::new();
        for relation in self.catalog.list_relations().await? {
            let primary_keys: HashSet<String> = self
                .catalog
                .primary_keys(&relation.name)
                .await?
                .into_iter()
                .collect();

            let columns = self
                .catalog
                .list_columns(&relation.name)
                .await?
                .into_iter()
                .map(|c| ColumnInfo {
                    is_primary_key: primary_keys.contains(&c.name),
                    column_name: c.name,
                    data_type: c.data_type,
                    column_size: c.size,
                    nullable: c.nullable,
                })
                .collect();

            tables.push(TableInfo {
                table_name: relation.name,
                table_type: normalize_relation_type(&relation.relation_type),
                columns,
            });
        }

        tracing::info!(tables = tables.len(), "schema structure retrieved");

        let structure = SchemaStructure {
            database_name: resolved_name,
            database_type,
            tables,
        };
        self.cache
            .schemas
            .insert(database_name, structure.clone());
        Ok((structure, false))
    }

    /// Full detail for one table: columns, indexes, foreign keys and
    /// constraints.
    pub async fn table_details(&self, table_name: &str) -> Result<(TableDetails, bool), ToolError> {
        if let Some(cached) = self.cache.tables.get(table_name) {
            return Ok((cached, true));
        }

        tracing::info!(table = table_name, "introspecting table details");

        let table_type = self
            .catalog
            .list_relations()
            .await?
            .into_iter()
            .find(|r| r.name == table_name)
            .map(|r| normalize_relation_type(&r.relation_type))
            .unwrap_or_else(|| "TABLE".to_string());

        let primary_keys: HashSet<String> = self
            .catalog
            .primary_keys(table_name)
            .await?
            .into_iter()
            .collect();

        let columns = self
            .catalog
            .list_columns(table_name)
            .await?
            .into_iter()
            .map(|c| ColumnDetail {
                is_primary_key: primary_keys.contains(&c.name),
                column_name: c.name,
                data_type: c.data_type,
                column_size: c.size,
                decimal_digits: c.decimal_digits,
                nullable: c.nullable,
                default_value: c.default_value,
                is_auto_increment: c.auto_increment,
            })
            .collect();

        // statistics entries without an index name carry no usable info
        let indexes = self
            .catalog
            .indexes(table_name)
            .await?
            .into_iter()
            .filter_map(|ix| {
                ix.name.map(|name| IndexInfo {
                    index_name: name,
                    unique: ix.unique,
                    column_name: ix.column,
                    ordinal_position: ix.ordinal_position,
                })
            })
            .collect();

        let foreign_keys = self
            .catalog
            .imported_keys(table_name)
            .await?
            .into_iter()
            .map(|fk| ForeignKeyInfo {
                fk_name: fk.name,
                fk_column: fk.column,
                referenced_table: fk.referenced_table,
                referenced_column: fk.referenced_column,
                update_rule: normalize_rule(&fk.update_rule),
                delete_rule: normalize_rule(&fk.delete_rule),
            })
            .collect();

        let constraints = self
            .catalog
            .table_constraints(table_name)
            .await?
            .into_iter()
            .map(|c| ConstraintInfo {
                constraint_name: c.name,
                constraint_type: c.constraint_type,
                column_name: c.column,
            })
            .collect();

        let details = TableDetails {
            table_name: table_name.to_string(),
            table_type,
            columns,
            indexes,
            foreign_keys,
            constraints,
        };
        self.cache.tables.insert(table_name, details.clone());
        Ok((details, false))
    }

    /// Triggers on `table_name`, via the dialect-specific catalog query.
    /// An unrecognized product yields an empty list, not an error.
    pub async fn list_triggers(&self, table_name: &str) -> Result<(TriggerList, bool), ToolError> {
        if let Some(cached) = self.cache.triggers.get(table_name) {
            return Ok((cached, true));
        }

        let product = self.catalog.product_name().await?;
        let dialect = Dialect::from_product_name(&product);

        let triggers = match trigger_query(dialect) {
            Some(sql) => self
                .executor
                .fetch_with_param(&sql, table_name)
                .await?
                .iter()
                .map(|row| TriggerInfo {
                    trigger_name: text_field(row, "trigger_name"),
                    event: text_field(row, "trigger_event"),
                    timing: text_field(row, "action_timing"),
                    statement: text_field(row, "action_statement"),
                })
                .collect(),
            None => {
                tracing::warn!(product = %product, "trigger listing not implemented for this product");
                Vec::new()
            }
        };

        tracing::info!(table = table_name, count = triggers.len(), "triggers retrieved");

        let list = TriggerList {
            table_name: table_name.to_string(),
            triggers,
        };
        self.cache.triggers.insert(table_name, list.clone());
        Ok((list, false))
    }
}

fn normalize_relation_type(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "BASE TABLE" | "TABLE" => "TABLE".to_string(),
        "VIEW" => "VIEW".to_string(),
        other => other.to_string(),
    }
}

/// The per-dialect trigger catalog query, with the table name as the only
/// bind parameter. `None` for products we cannot query.
fn trigger_query(dialect: Dialect) -> Option<String> {
    let p1 = dialect.placeholder(1);
    match dialect {
        Dialect::Postgres => Some(format!(
            "SELECT trigger_name, event_manipulation AS trigger_event, \
                    action_timing, action_statement \
             FROM information_schema.triggers \
             WHERE event_object_table = {p1} \
             ORDER BY trigger_name"
        )),
        Dialect::MySql => Some(format!(
            "SELECT TRIGGER_NAME AS trigger_name, EVENT_MANIPULATION AS trigger_event, \
                    ACTION_TIMING AS action_timing, ACTION_STATEMENT AS action_statement \
             FROM information_schema.triggers \
             WHERE EVENT_OBJECT_TABLE = {p1} \
             ORDER BY TRIGGER_NAME"
        )),
        Dialect::Oracle => Some(format!(
            "SELECT trigger_name, triggering_event AS trigger_event, \
                    trigger_type AS action_timing, trigger_body AS action_statement \
             FROM all_triggers \
             WHERE table_name = UPPER({p1}) \
             ORDER BY trigger_name"
        )),
        Dialect::SqlServer => Some(format!(
            "SELECT t.name AS trigger_name, \
                    CASE WHEN te.type = 1 THEN 'INSERT' \
                         WHEN te.type = 2 THEN 'UPDATE' \
                         WHEN te.type = 3 THEN 'DELETE' \
                         ELSE 'MULTIPLE' END AS trigger_event, \
                    CASE WHEN t.is_instead_of_trigger = 1 THEN 'INSTEAD OF' \
                         ELSE 'AFTER' END AS action_timing, \
                    m.definition AS action_statement \
             FROM sys.triggers t \
             INNER JOIN sys.trigger_events te ON t.object_id = te.object_id \
             INNER JOIN sys.sql_modules m ON t.object_id = m.object_id \
             INNER JOIN sys.tables tb ON t.parent_id = tb.object_id \
             WHERE tb.name = {p1} \
             ORDER BY t.name"
        )),
        Dialect::Other => None,
    }
}

fn text_field(row: &Row, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

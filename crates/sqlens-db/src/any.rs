//! sqlx `AnyPool`-backed data source.
//!
//! Implements both [`QueryExecutor`] and [`CatalogReader`] over the
//! type-erased Any driver, so one binary serves Postgres and MySQL without
//! compile-time driver selection. Catalog queries are written per dialect
//! against `information_schema` (plus `pg_catalog` for Postgres indexes).
//!
//! Connections are checked out of the pool per statement and returned when
//! the future completes; nothing is held across calls.

use crate::dialect::Dialect;
use crate::source::{
    CatalogColumn, CatalogConstraint, CatalogForeignKey, CatalogIndex, CatalogReader,
    QueryExecutor, RelationEntry, SourceError, SourceResult,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlens_core::types::Row;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Column, Row as SqlxRow};

/// Data source over a sqlx `AnyPool`.
pub struct AnySource {
    pool: AnyPool,
    dialect: Dialect,
    product: String,
}

impl AnySource {
    /// Connect to `url` and detect the product name.
    ///
    /// `sqlx::any::install_default_drivers()` must have been called once by
    /// the binary before this.
    pub async fn connect(url: &str) -> SourceResult<Self> {
        let dialect = Dialect::from_url(url);
        let pool = AnyPool::connect(url)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        let product = match dialect {
            Dialect::Postgres => {
                let row = sqlx::query("SELECT version()").fetch_one(&pool).await?;
                row.try_get::<String, _>(0)
                    .unwrap_or_else(|_| "PostgreSQL".to_string())
            }
            Dialect::MySql => {
                let row = sqlx::query("SELECT VERSION()").fetch_one(&pool).await?;
                let version = row.try_get::<String, _>(0).unwrap_or_default();
                format!("MySQL {version}").trim_end().to_string()
            }
            other => other.to_string(),
        };

        tracing::info!(dialect = %dialect, product = %product, "connected data source");

        Ok(Self {
            pool,
            dialect,
            product,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn unsupported(&self) -> SourceError {
        SourceError::Unsupported(self.product.clone())
    }
}

#[async_trait]
impl QueryExecutor for AnySource {
    async fn fetch_all(&self, sql: &str) -> SourceResult<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn fetch_with_param(&self, sql: &str, param: &str) -> SourceResult<Vec<Row>> {
        let rows = sqlx::query(sql).bind(param).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

#[async_trait]
impl CatalogReader for AnySource {
    async fn product_name(&self) -> SourceResult<String> {
        Ok(self.product.clone())
    }

    async fn current_database(&self) -> SourceResult<Option<String>> {
        let sql = match self.dialect {
            Dialect::Postgres => "SELECT current_database()",
            Dialect::MySql => "SELECT DATABASE()",
            _ => return Ok(None),
        };
        let row = sqlx::query(sql).fetch_one(&self.pool).await?;
        Ok(row.try_get::<Option<String>, _>(0).unwrap_or(None))
    }

    async fn list_relations(&self) -> SourceResult<Vec<RelationEntry>> {
        let sql = match self.dialect {
            Dialect::Postgres => {
                "SELECT table_name, table_type FROM information_schema.tables \
                 WHERE table_schema = current_schema() \
                   AND table_type IN ('BASE TABLE', 'VIEW') \
                 ORDER BY table_name"
            }
            Dialect::MySql => {
                "SELECT TABLE_NAME AS table_name, TABLE_TYPE AS table_type \
                 FROM information_schema.tables \
                 WHERE TABLE_SCHEMA = DATABASE() \
                   AND TABLE_TYPE IN ('BASE TABLE', 'VIEW') \
                 ORDER BY TABLE_NAME"
            }
            _ => return Err(self.unsupported()),
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(RelationEntry {
                    name: row.try_get("table_name")?,
                    relation_type: row.try_get("table_type")?,
                })
            })
            .collect()
    }

    async fn list_columns(&self, table: &str) -> SourceResult<Vec<CatalogColumn>> {
        let sql = match self.dialect {
            Dialect::Postgres => {
                "SELECT column_name, data_type, character_maximum_length, numeric_precision, \
                        numeric_scale, is_nullable, column_default, is_identity \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position"
            }
            Dialect::MySql => {
                "SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type, \
                        CHARACTER_MAXIMUM_LENGTH AS character_maximum_length, \
                        NUMERIC_PRECISION AS numeric_precision, \
                        NUMERIC_SCALE AS numeric_scale, \
                        IS_NULLABLE AS is_nullable, \
                        COLUMN_DEFAULT AS column_default, \
                        EXTRA AS extra \
                 FROM information_schema.columns \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION"
            }
            _ => return Err(self.unsupported()),
        };

        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let char_len: Option<i64> = row.try_get("character_maximum_length").unwrap_or(None);
                let precision: Option<i64> = row.try_get("numeric_precision").unwrap_or(None);
                let default_value: Option<String> = row.try_get("column_default").unwrap_or(None);
                let nullable: String = row.try_get("is_nullable")?;

                let auto_increment = match self.dialect {
                    Dialect::Postgres => {
                        let identity: Option<String> = row.try_get("is_identity").unwrap_or(None);
                        identity.as_deref() == Some("YES")
                            || default_value
                                .as_deref()
                                .is_some_and(|d| d.starts_with("nextval("))
                    }
                    _ => {
                        let extra: Option<String> = row.try_get("extra").unwrap_or(None);
                        extra.is_some_and(|e| e.to_lowercase().contains("auto_increment"))
                    }
                };

                Ok(CatalogColumn {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    size: char_len.or(precision),
                    decimal_digits: row.try_get("numeric_scale").unwrap_or(None),
                    nullable: nullable == "YES",
                    default_value,
                    auto_increment,
                })
            })
            .collect()
    }

    async fn primary_keys(&self, table: &str) -> SourceResult<Vec<String>> {
        let sql = match self.dialect {
            Dialect::Postgres => {
                "SELECT kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' \
                   AND tc.table_schema = current_schema() \
                   AND tc.table_name = $1 \
                 ORDER BY kcu.ordinal_position"
            }
            Dialect::MySql => {
                "SELECT COLUMN_NAME AS column_name \
                 FROM information_schema.key_column_usage \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND CONSTRAINT_NAME = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION"
            }
            _ => return Err(self.unsupported()),
        };

        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("column_name")?))
            .collect()
    }

    async fn indexes(&self, table: &str) -> SourceResult<Vec<CatalogIndex>> {
        match self.dialect {
            Dialect::Postgres => {
                let sql = "SELECT i.relname AS index_name, ix.indisunique AS is_unique, \
                                  a.attname AS column_name, k.ord AS ordinal_position \
                           FROM pg_class t \
                           JOIN pg_index ix ON t.oid = ix.indrelid \
                           JOIN pg_class i ON i.oid = ix.indexrelid \
                           JOIN unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true \
                           JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                           WHERE t.relname = $1 \
                           ORDER BY i.relname, k.ord";
                let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
                rows.iter()
                    .map(|row| {
                        Ok(CatalogIndex {
                            name: row.try_get("index_name").ok(),
                            unique: row.try_get("is_unique")?,
                            column: row.try_get("column_name")?,
                            ordinal_position: row.try_get("ordinal_position")?,
                        })
                    })
                    .collect()
            }
            Dialect::MySql => {
                let sql = "SELECT INDEX_NAME AS index_name, NON_UNIQUE AS non_unique, \
                                  COLUMN_NAME AS column_name, SEQ_IN_INDEX AS seq_in_index \
                           FROM information_schema.statistics \
                           WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                           ORDER BY INDEX_NAME, SEQ_IN_INDEX";
                let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
                rows.iter()
                    .map(|row| {
                        let non_unique: i64 = row.try_get("non_unique")?;
                        Ok(CatalogIndex {
                            name: row.try_get("index_name").ok(),
                            unique: non_unique == 0,
                            column: row.try_get("column_name")?,
                            ordinal_position: row.try_get("seq_in_index")?,
                        })
                    })
                    .collect()
            }
            _ => Err(self.unsupported()),
        }
    }

    async fn imported_keys(&self, table: &str) -> SourceResult<Vec<CatalogForeignKey>> {
        let sql = match self.dialect {
            Dialect::Postgres => {
                "SELECT tc.constraint_name, kcu.column_name, \
                        ccu.table_name AS referenced_table, \
                        ccu.column_name AS referenced_column, \
                        rc.update_rule, rc.delete_rule \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON ccu.constraint_name = tc.constraint_name \
                  AND ccu.table_schema = tc.table_schema \
                 JOIN information_schema.referential_constraints rc \
                   ON rc.constraint_name = tc.constraint_name \
                  AND rc.constraint_schema = tc.table_schema \
                 WHERE tc.constraint_type = 'FOREIGN KEY' \
                   AND tc.table_schema = current_schema() \
                   AND tc.table_name = $1 \
                 ORDER BY tc.constraint_name, kcu.ordinal_position"
            }
            Dialect::MySql => {
                "SELECT kcu.CONSTRAINT_NAME AS constraint_name, \
                        kcu.COLUMN_NAME AS column_name, \
                        kcu.REFERENCED_TABLE_NAME AS referenced_table, \
                        kcu.REFERENCED_COLUMN_NAME AS referenced_column, \
                        rc.UPDATE_RULE AS update_rule, rc.DELETE_RULE AS delete_rule \
                 FROM information_schema.key_column_usage kcu \
                 JOIN information_schema.referential_constraints rc \
                   ON rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
                  AND rc.CONSTRAINT_SCHEMA = kcu.TABLE_SCHEMA \
                 WHERE kcu.TABLE_SCHEMA = DATABASE() AND kcu.TABLE_NAME = ? \
                   AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
                 ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION"
            }
            _ => return Err(self.unsupported()),
        };

        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(CatalogForeignKey {
                    name: row.try_get("constraint_name")?,
                    column: row.try_get("column_name")?,
                    referenced_table: row.try_get("referenced_table")?,
                    referenced_column: row.try_get("referenced_column")?,
                    update_rule: row.try_get("update_rule")?,
                    delete_rule: row.try_get("delete_rule")?,
                })
            })
            .collect()
    }

    async fn table_constraints(&self, table: &str) -> SourceResult<Vec<CatalogConstraint>> {
        let sql = match self.dialect {
            Dialect::Postgres => {
                "SELECT tc.constraint_name, tc.constraint_type, kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 LEFT JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 WHERE tc.table_schema = current_schema() AND tc.table_name = $1 \
                 ORDER BY tc.constraint_name, kcu.ordinal_position"
            }
            Dialect::MySql => {
                "SELECT tc.CONSTRAINT_NAME AS constraint_name, \
                        tc.CONSTRAINT_TYPE AS constraint_type, \
                        kcu.COLUMN_NAME AS column_name \
                 FROM information_schema.table_constraints tc \
                 LEFT JOIN information_schema.key_column_usage kcu \
                   ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
                  AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA \
                  AND tc.TABLE_NAME = kcu.TABLE_NAME \
                 WHERE tc.TABLE_SCHEMA = DATABASE() AND tc.TABLE_NAME = ? \
                 ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION"
            }
            _ => return Err(self.unsupported()),
        };

        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(CatalogConstraint {
                    name: row.try_get("constraint_name")?,
                    constraint_type: row.try_get("constraint_type")?,
                    column: row.try_get("column_name").unwrap_or(None),
                })
            })
            .collect()
    }
}

/// Decode an `AnyRow` into an ordered column-to-JSON map.
///
/// The Any driver has no single value type, so this tries the scalar types
/// it can decode in order; anything undecodable comes back as null.
fn row_to_map(row: &AnyRow) -> Row {
    let mut map = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), decode_any_value(row, idx));
    }
    map
}

fn decode_any_value(row: &AnyRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|bytes| Value::from(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null);
    }
    Value::Null
}

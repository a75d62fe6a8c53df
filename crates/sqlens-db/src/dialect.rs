//! SQL dialect selection.
//!
//! The core never depends on a specific database product beyond matching its
//! product name here. Each dialect knows how to render a row-limiting clause
//! and which bind-placeholder syntax its driver expects.

use serde::Serialize;

/// A recognized database product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    Oracle,
    SqlServer,
    /// Anything we cannot classify. Treated as LIMIT-style for row caps;
    /// trigger listing returns empty for it.
    Other,
}

impl Dialect {
    /// Classify from the product name the catalog reports
    /// (e.g. "PostgreSQL 16.1", "MySQL", "Microsoft SQL Server").
    pub fn from_product_name(product: &str) -> Self {
        let upper = product.to_uppercase();
        if upper.contains("POSTGRESQL") {
            Self::Postgres
        } else if upper.contains("MYSQL") || upper.contains("MARIADB") {
            Self::MySql
        } else if upper.contains("ORACLE") {
            Self::Oracle
        } else if upper.contains("SQL SERVER") {
            Self::SqlServer
        } else {
            Self::Other
        }
    }

    /// Classify from a connection URL scheme
    /// (e.g. `postgres://…`, `mysql://…`).
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split("://").next().unwrap_or("").to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            "mysql" | "mariadb" => Self::MySql,
            "oracle" => Self::Oracle,
            "sqlserver" | "mssql" => Self::SqlServer,
            _ => Self::Other,
        }
    }

    /// Append (or splice in) a row-limiting clause capping `query` at
    /// `max_rows`. Callers are responsible for checking that the query
    /// does not already carry one.
    pub fn render_limit(&self, query: &str, max_rows: u32) -> String {
        match self {
            Self::Postgres | Self::MySql | Self::Other => {
                format!("{query} LIMIT {max_rows}")
            }
            Self::Oracle => format!("{query} FETCH FIRST {max_rows} ROWS ONLY"),
            // T-SQL caps with TOP right after the SELECT keyword.
            Self::SqlServer => {
                let trimmed = query.trim_start();
                match trimmed.get(..6) {
                    Some(head) if head.eq_ignore_ascii_case("select") => {
                        format!("SELECT TOP {max_rows}{}", &trimmed[6..])
                    }
                    _ => format!("{query} OFFSET 0 ROWS FETCH NEXT {max_rows} ROWS ONLY"),
                }
            }
        }
    }

    /// Bind-placeholder syntax for the nth (1-based) parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            _ => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::SqlServer => "sqlserver",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_product_names() {
        assert_eq!(Dialect::from_product_name("PostgreSQL 16.1"), Dialect::Postgres);
        assert_eq!(Dialect::from_product_name("MySQL"), Dialect::MySql);
        assert_eq!(Dialect::from_product_name("Oracle Database 19c"), Dialect::Oracle);
        assert_eq!(
            Dialect::from_product_name("Microsoft SQL Server 2022"),
            Dialect::SqlServer
        );
        assert_eq!(Dialect::from_product_name("DuckDB"), Dialect::Other);
    }

    #[test]
    fn classifies_urls() {
        assert_eq!(Dialect::from_url("postgres://localhost/app"), Dialect::Postgres);
        assert_eq!(Dialect::from_url("postgresql://localhost/app"), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://localhost/app"), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite://file.db"), Dialect::Other);
    }

    #[test]
    fn renders_limit_per_dialect() {
        let q = "SELECT * FROM orders";
        assert_eq!(
            Dialect::Postgres.render_limit(q, 100),
            "SELECT * FROM orders LIMIT 100"
        );
        assert_eq!(
            Dialect::Oracle.render_limit(q, 100),
            "SELECT * FROM orders FETCH FIRST 100 ROWS ONLY"
        );
        assert_eq!(
            Dialect::SqlServer.render_limit(q, 100),
            "SELECT TOP 100 * FROM orders"
        );
    }

    #[test]
    fn sql_server_top_is_case_insensitive() {
        assert_eq!(
            Dialect::SqlServer.render_limit("select name from t", 5),
            "SELECT TOP 5 name from t"
        );
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(1), "$1");
        assert_eq!(Dialect::MySql.placeholder(1), "?");
    }
}

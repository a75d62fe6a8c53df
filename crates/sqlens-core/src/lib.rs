//! # sqlens-core
//!
//! Shared building blocks for the sqlens workspace: server configuration,
//! the result types returned by introspection and query tools, and the
//! error taxonomy every other crate maps into.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ServerConfig, ServerIdentity};
pub use error::ToolError;
pub use types::{
    ColumnDetail, ColumnInfo, ConstraintInfo, ForeignKeyInfo, IndexInfo, QueryResult, Row,
    SchemaStructure, TableDetails, TableInfo, TriggerInfo, TriggerList,
};

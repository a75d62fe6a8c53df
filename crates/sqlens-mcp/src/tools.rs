//! Tool catalog and dispatch.
//!
//! The four callable operations, their parameter schemas, and the typed
//! boundary between the wire's loose argument bags and the components that
//! do the work. Arguments are validated and converted into a [`ToolCall`]
//! variant before anything downstream runs.

use serde_json::{json, Map, Value};
use sqlens_core::error::ToolError;
use sqlens_core::types::{QueryResult, SchemaStructure, TableDetails, TriggerList};
use sqlens_db::{Introspector, SecureQueryEngine};
use std::sync::Arc;

/// Argument type accepted by a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
}

impl ParameterType {
    fn json_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub param_type: ParameterType,
    pub description: &'static str,
    pub required: bool,
}

/// A tool as advertised through `tools/list`. Parameters keep their
/// declared order in the rendered schema.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    /// Render the JSON Schema object advertised for this tool.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.to_string(),
                json!({
                    "type": param.param_type.json_name(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A validated tool invocation with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetSchemaStructure {
        database_name: String,
    },
    GetTableDetails {
        table_name: String,
    },
    ListTriggers {
        table_name: String,
    },
    SecureDatabaseQuery {
        query_description: String,
        max_rows: Option<i64>,
    },
}

impl ToolCall {
    /// Convert a tool name and raw argument bag into a typed call.
    ///
    /// Fails with a validation error for unknown tool names and for
    /// missing or blank required string arguments.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        match name {
            "getSchemaStructure" => Ok(Self::GetSchemaStructure {
                database_name: optional_string(arguments, "databaseName")
                    .unwrap_or_else(|| "default".to_string()),
            }),
            "getTableDetails" => Ok(Self::GetTableDetails {
                table_name: required_string(arguments, "tableName")?,
            }),
            "listTriggers" => Ok(Self::ListTriggers {
                table_name: required_string(arguments, "tableName")?,
            }),
            "secureDatabaseQuery" => Ok(Self::SecureDatabaseQuery {
                query_description: required_string(arguments, "queryDescription")?,
                max_rows: arguments.get("maxRows").and_then(Value::as_i64),
            }),
            other => Err(ToolError::validation(format!("Unknown tool: {other}"))),
        }
    }

    /// The tool name this call dispatches to.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::GetSchemaStructure { .. } => "getSchemaStructure",
            Self::GetTableDetails { .. } => "getTableDetails",
            Self::ListTriggers { .. } => "listTriggers",
            Self::SecureDatabaseQuery { .. } => "secureDatabaseQuery",
        }
    }
}

fn required_string(arguments: &Value, key: &str) -> Result<String, ToolError> {
    match arguments.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(ToolError::validation(format!(
            "{key} parameter is required"
        ))),
    }
}

fn optional_string(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// What a tool call produced, before response shaping.
#[derive(Debug, Clone)]
pub enum ToolResult {
    Schema(SchemaStructure),
    Table(TableDetails),
    Triggers(TriggerList),
    Query(QueryResult),
}

impl ToolResult {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Schema(s) => serde_json::to_value(s),
            Self::Table(t) => serde_json::to_value(t),
            Self::Triggers(t) => serde_json::to_value(t),
            Self::Query(q) => serde_json::to_value(q),
        }
        .unwrap_or(Value::Null)
    }
}

/// A tool result plus whether the metadata cache served it.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub result: ToolResult,
    pub cached: bool,
}

/// The fixed tool catalog, wired to the introspector and query engine.
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    introspector: Arc<Introspector>,
    engine: Arc<SecureQueryEngine>,
}

impl ToolRegistry {
    pub fn new(introspector: Arc<Introspector>, engine: Arc<SecureQueryEngine>) -> Self {
        Self {
            definitions: build_definitions(),
            introspector,
            engine,
        }
    }

    /// The full catalog, in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute a validated tool call.
    ///
    /// Downstream failures come back as execution errors with the original
    /// message; validation and security kinds pass through untouched so the
    /// dispatcher can classify them.
    pub async fn execute(&self, call: ToolCall) -> Result<ToolOutcome, ToolError> {
        let outcome = match call {
            ToolCall::GetSchemaStructure { database_name } => {
                let (schema, cached) = self
                    .introspector
                    .schema_structure(&database_name)
                    .await
                    .map_err(ToolError::wrap_execution)?;
                ToolOutcome {
                    result: ToolResult::Schema(schema),
                    cached,
                }
            }
            ToolCall::GetTableDetails { table_name } => {
                let (details, cached) = self
                    .introspector
                    .table_details(&table_name)
                    .await
                    .map_err(ToolError::wrap_execution)?;
                ToolOutcome {
                    result: ToolResult::Table(details),
                    cached,
                }
            }
            ToolCall::ListTriggers { table_name } => {
                let (triggers, cached) = self
                    .introspector
                    .list_triggers(&table_name)
                    .await
                    .map_err(ToolError::wrap_execution)?;
                ToolOutcome {
                    result: ToolResult::Triggers(triggers),
                    cached,
                }
            }
            ToolCall::SecureDatabaseQuery {
                query_description,
                max_rows,
            } => {
                let result = self
                    .engine
                    .execute(&query_description, max_rows)
                    .await
                    .map_err(ToolError::wrap_execution)?;
                ToolOutcome {
                    result: ToolResult::Query(result),
                    cached: false,
                }
            }
        };
        Ok(outcome)
    }
}

fn build_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "getSchemaStructure",
            description: "Get the complete database schema structure including all tables, \
                          views, and their columns",
            parameters: vec![ParameterSpec {
                name: "databaseName",
                param_type: ParameterType::String,
                description: "Name of the database to introspect (defaults to the connected one)",
                required: false,
            }],
        },
        ToolDefinition {
            name: "getTableDetails",
            description: "Get detailed information about a specific table including columns, \
                          indexes, foreign keys, and constraints",
            parameters: vec![ParameterSpec {
                name: "tableName",
                param_type: ParameterType::String,
                description: "Name of the table to describe",
                required: true,
            }],
        },
        ToolDefinition {
            name: "listTriggers",
            description: "List all triggers defined on a specific table",
            parameters: vec![ParameterSpec {
                name: "tableName",
                param_type: ParameterType::String,
                description: "Name of the table whose triggers to list",
                required: true,
            }],
        },
        ToolDefinition {
            name: "secureDatabaseQuery",
            description: "Execute a read-only SELECT query with automatic row limiting. \
                          Any non-SELECT statement is rejected",
            parameters: vec![
                ParameterSpec {
                    name: "queryDescription",
                    param_type: ParameterType::String,
                    description: "The SELECT query to execute",
                    required: true,
                },
                ParameterSpec {
                    name: "maxRows",
                    param_type: ParameterType::Integer,
                    description: "Maximum number of rows to return (capped by server config)",
                    required: false,
                },
            ],
        },
    ]
}

//! End-to-end dispatcher tests over an in-memory data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlens_core::config::ServerIdentity;
use sqlens_core::types::Row;
use sqlens_db::source::{
    CatalogColumn, CatalogConstraint, CatalogForeignKey, CatalogIndex, CatalogReader,
    QueryExecutor, RelationEntry, SourceResult,
};
use sqlens_db::{Dialect, Introspector, MetadataCache, SecureQueryEngine};
use sqlens_mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use sqlens_mcp::{McpServer, MetricsRegistry, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;

struct FakeCatalog;

#[async_trait]
impl CatalogReader for FakeCatalog {
    async fn product_name(&self) -> SourceResult<String> {
        Ok("PostgreSQL 16.1".to_string())
    }

    async fn current_database(&self) -> SourceResult<Option<String>> {
        Ok(Some("shop".to_string()))
    }

    async fn list_relations(&self) -> SourceResult<Vec<RelationEntry>> {
        Ok(vec![RelationEntry {
            name: "customers".to_string(),
            relation_type: "BASE TABLE".to_string(),
        }])
    }

    async fn list_columns(&self, _table: &str) -> SourceResult<Vec<CatalogColumn>> {
        Ok(vec![CatalogColumn {
            name: "id".to_string(),
            data_type: "integer".to_string(),
            size: Some(32),
            decimal_digits: Some(0),
            nullable: false,
            default_value: None,
            auto_increment: true,
        }])
    }

    async fn primary_keys(&self, _table: &str) -> SourceResult<Vec<String>> {
        Ok(vec!["id".to_string()])
    }

    async fn indexes(&self, _table: &str) -> SourceResult<Vec<CatalogIndex>> {
        Ok(vec![])
    }

    async fn imported_keys(&self, _table: &str) -> SourceResult<Vec<CatalogForeignKey>> {
        Ok(vec![])
    }

    async fn table_constraints(&self, _table: &str) -> SourceResult<Vec<CatalogConstraint>> {
        Ok(vec![])
    }
}

struct FakeExecutor;

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn fetch_all(&self, _sql: &str) -> SourceResult<Vec<Row>> {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        row.insert("name".to_string(), json!("ada"));
        Ok(vec![row])
    }

    async fn fetch_with_param(&self, _sql: &str, _param: &str) -> SourceResult<Vec<Row>> {
        Ok(vec![])
    }
}

fn test_server() -> McpServer {
    let catalog = Arc::new(FakeCatalog);
    let executor = Arc::new(FakeExecutor);
    let cache = Arc::new(MetadataCache::new(Duration::from_secs(60)));
    let introspector = Arc::new(Introspector::new(catalog, executor.clone(), cache));
    let engine = Arc::new(SecureQueryEngine::new(
        executor,
        Dialect::Postgres,
        1000,
        false,
    ));
    let registry = ToolRegistry::new(introspector, engine);

    McpServer::new(
        ServerIdentity::default(),
        registry,
        Arc::new(MetricsRegistry::new()),
        1000,
    )
}

fn request(method: &str, params: Option<Value>, id: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(id),
        method: method.to_string(),
        params,
    }
}

async fn call(server: &McpServer, method: &str, params: Option<Value>, id: Value) -> JsonRpcResponse {
    server.handle_request(request(method, params, id)).await
}

#[tokio::test]
async fn rejects_wrong_jsonrpc_version() {
    let server = test_server();
    let response = server
        .handle_request(JsonRpcRequest {
            jsonrpc: "1.0".to_string(),
            id: Some(json!(1)),
            method: "ping".to_string(),
            params: None,
        })
        .await;

    let error = response.error.unwrap();
    assert_eq!(error.code, -32600);
    assert_eq!(error.message, "Invalid JSON-RPC version");
}

#[tokio::test]
async fn ping_reports_server_name() {
    let server = test_server();
    let response = call(&server, "ping", None, json!(3)).await;

    assert_eq!(response.id, Some(json!(3)));
    assert_eq!(
        response.result.unwrap(),
        json!({"status": "ok", "server": "sqlens"})
    );
}

#[tokio::test]
async fn unknown_method_is_not_found() {
    let server = test_server();
    let response = call(&server, "resources/list", None, json!(9)).await;

    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Method not found: resources/list");
}

#[tokio::test]
async fn initialize_advertises_protocol_and_identity() {
    let server = test_server();
    let response = call(&server, "initialize", None, json!(1)).await;

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], json!("2024-11-05"));
    assert_eq!(result["serverInfo"]["name"], json!("sqlens"));
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_has_four_tools_with_schemas() {
    let server = test_server();
    let response = call(&server, "tools/list", None, json!(2)).await;

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 4);

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "getSchemaStructure",
            "getTableDetails",
            "listTriggers",
            "secureDatabaseQuery"
        ]
    );

    let details = &tools[1];
    assert_eq!(details["inputSchema"]["type"], json!("object"));
    assert_eq!(details["inputSchema"]["required"], json!(["tableName"]));
}

#[tokio::test]
async fn forbidden_query_is_a_security_violation() {
    let server = test_server();
    let response = call(
        &server,
        "tools/call",
        Some(json!({
            "name": "secureDatabaseQuery",
            "arguments": {"queryDescription": "DROP TABLE customers"}
        })),
        json!(7),
    )
    .await;

    assert_eq!(response.id, Some(json!(7)));
    let error = response.error.unwrap();
    assert_eq!(error.code, -32001);
    assert!(error.message.starts_with("Security violation:"));
}

#[tokio::test]
async fn missing_required_argument_is_reported_by_name() {
    let server = test_server();
    let response = call(
        &server,
        "tools/call",
        Some(json!({"name": "getTableDetails", "arguments": {}})),
        json!(6),
    )
    .await;

    assert_eq!(response.id, Some(json!(6)));
    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "tableName parameter is required");
}

#[tokio::test]
async fn unknown_tool_is_reported_by_name() {
    let server = test_server();
    let response = call(
        &server,
        "tools/call",
        Some(json!({"name": "dropEverything", "arguments": {}})),
        json!(8),
    )
    .await;

    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Unknown tool: dropEverything");
}

#[tokio::test]
async fn successful_query_wraps_result_with_metadata() {
    let server = test_server();
    let response = call(
        &server,
        "tools/call",
        Some(json!({
            "name": "secureDatabaseQuery",
            "arguments": {"queryDescription": "SELECT id, name FROM customers"}
        })),
        json!(5),
    )
    .await;

    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(false));
    assert_eq!(result["content"][0]["type"], json!("text"));

    let text = result["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["rowCount"], json!(1));
    assert_eq!(payload["columnNames"], json!(["id", "name"]));
    assert_eq!(payload["query"], json!("SELECT id, name FROM customers"));

    let meta = &result["meta"];
    assert!(meta["tokens"]["estimated"].as_u64().unwrap() > 0);
    assert_eq!(meta["data"]["rowCount"], json!(1));
    assert_eq!(meta["data"]["columnCount"], json!(2));
    assert_eq!(meta["data"]["truncated"], json!(false));
    assert_eq!(meta["performance"]["cachedResult"], json!(false));
}

#[tokio::test]
async fn repeated_introspection_is_served_from_cache() {
    let server = test_server();
    let params = json!({"name": "getSchemaStructure", "arguments": {}});

    let first = call(&server, "tools/call", Some(params.clone()), json!(10)).await;
    assert_eq!(
        first.result.unwrap()["meta"]["performance"]["cachedResult"],
        json!(false)
    );

    let second = call(&server, "tools/call", Some(params), json!(11)).await;
    assert_eq!(
        second.result.unwrap()["meta"]["performance"]["cachedResult"],
        json!(true)
    );
}

#[tokio::test]
async fn calls_accumulate_per_tool_metrics() {
    let server = test_server();
    let params = json!({
        "name": "secureDatabaseQuery",
        "arguments": {"queryDescription": "SELECT id FROM customers"}
    });

    for i in 0..3 {
        call(&server, "tools/call", Some(params.clone()), json!(i)).await;
    }

    let stats = server.metrics().statistics("secureDatabaseQuery").unwrap();
    assert_eq!(stats.total_calls, 3);
    assert!(stats.avg_tokens > 0.0);
    assert_eq!(stats.cache_hit_rate, 0.0);
}

#[tokio::test]
async fn request_without_id_echoes_null_id() {
    let server = test_server();
    let response = server
        .handle_request(JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "ping".to_string(),
            params: None,
        })
        .await;
    assert_eq!(response.id, None);
}

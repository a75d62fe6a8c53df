//! sqlens server binary.
//!
//! Wires configuration, the data source, the tool registry and the HTTP
//! transport together and serves until the process is stopped.

use anyhow::Context;
use clap::Parser;
use sqlens_core::config::ServerConfig;
use sqlens_db::{AnySource, Introspector, MetadataCache, SecureQueryEngine};
use sqlens_mcp::{HttpServer, McpServer, MetricsRegistry, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sqlens", version, about = "Database introspection server for LLM agents")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "SQLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Database connection URL, overriding the config file.
    #[arg(long, env = "SQLENS_DATABASE_URL")]
    database_url: Option<String>,

    /// HTTP bind port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let url = config.resolved_database_url().context(
        "no database URL configured; set database_url in the config file \
         or the SQLENS_DATABASE_URL environment variable",
    )?;

    sqlx::any::install_default_drivers();
    let source = Arc::new(
        AnySource::connect(&url)
            .await
            .context("connecting to the database")?,
    );
    let dialect = source.dialect();

    let cache = Arc::new(MetadataCache::new(Duration::from_secs(
        config.metadata_cache_ttl_secs,
    )));
    let introspector = Arc::new(Introspector::new(source.clone(), source.clone(), cache));
    let engine = Arc::new(SecureQueryEngine::new(
        source,
        dialect,
        config.max_query_rows,
        config.enable_query_logging,
    ));

    let server = Arc::new(McpServer::new(
        config.server.clone(),
        ToolRegistry::new(introspector, engine),
        Arc::new(MetricsRegistry::new()),
        config.max_query_rows,
    ));

    tracing::info!(
        name = %config.server.name,
        host = %config.host,
        port = config.port,
        "starting sqlens"
    );

    HttpServer::new(config.host, config.port, server).run().await?;
    Ok(())
}

//! KG MCP Server Entry Point
//!
//! Opens the graph store and serves the Model Context Protocol over stdio
//! (default) or HTTP.

use clap::Parser;
use kg_mcp::{Config, McpServer, Transport};
use kg_store::GraphStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // stdout carries the stdio transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kg_mcp=info,kg_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Opening graph store at {}", config.db_path.display());
    let store = match GraphStore::open(&config.db_path, config.store_config()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open graph store: {}", e);
            std::process::exit(1);
        }
    };

    let server = McpServer::new(store);
    let result = match config.transport {
        Transport::Stdio => server.run().await,
        Transport::Http => kg_mcp::mcp::http::run_server(server, &config.host, config.port).await,
    };

    if let Err(e) = result {
        tracing::error!("MCP server error: {}", e);
        std::process::exit(1);
    }
}

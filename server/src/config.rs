//! Command-line and environment configuration, read once at startup.

use clap::{Parser, ValueEnum};
use kg_store::{StoreConfig, TraversalLimits};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over `POST /mcp`
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "kg-mcp")]
#[command(about = "Knowledge-graph MCP server")]
#[command(version)]
pub struct Config {
    /// Directory of the RocksDB store
    #[arg(long, env = "KG_DB_PATH", default_value = "./data/kg")]
    pub db_path: PathBuf,

    #[arg(long, env = "KG_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// HTTP bind address
    #[arg(long, env = "KG_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port
    #[arg(long, env = "KG_PORT", default_value_t = 8099)]
    pub port: u16,

    /// How long a writer waits for a row lock before aborting
    #[arg(long, env = "KG_LOCK_TIMEOUT_MS", default_value_t = 2000)]
    pub lock_timeout_ms: i64,

    /// Upper bound on traversal depth
    #[arg(long, env = "KG_MAX_HOPS", default_value_t = 5)]
    pub max_hops: u32,
}

impl Config {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            lock_timeout_ms: self.lock_timeout_ms,
            limits: TraversalLimits {
                max_hops: self.max_hops,
                ..TraversalLimits::default()
            },
        }
    }
}

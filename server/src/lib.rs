//! KG MCP Server Library
//!
//! Model Context Protocol server over the `kg-store` knowledge graph:
//! protocol types, stdio and HTTP transports, the tool catalogue and
//! the handlers that call into the store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod mcp;

pub use config::{Config, Transport};
pub use error::ToolError;
pub use mcp::McpServer;

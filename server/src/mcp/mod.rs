//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the knowledge-graph store to AI clients as MCP tools and resources.
//!
//! ## Usage
//!
//! ```bash
//! kg-mcp --db-path ./data/kg                      # stdio
//! kg-mcp --transport http --port 8099             # POST /mcp
//! ```
//!
//! Both transports speak JSON-RPC 2.0.

pub mod http;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::*;
pub use server::McpServer;

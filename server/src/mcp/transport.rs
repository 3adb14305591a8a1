//! MCP Transport Layer
//!
//! Newline-delimited JSON-RPC 2.0 over stdio.

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// One line read from the client
#[derive(Debug)]
pub enum Incoming {
    Request(JsonRpcRequest),
    /// A line that is not a valid JSON-RPC request; answer with this error
    Invalid(JsonRpcError),
    /// Blank line
    Empty,
}

/// Parse one line into a request, or the error the client should receive
pub fn parse_line(line: &str) -> Incoming {
    let line = line.trim();
    if line.is_empty() {
        return Incoming::Empty;
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to parse JSON-RPC message: {}", e);
            return Incoming::Invalid(JsonRpcError::parse_error(format!("Parse error: {}", e)));
        }
    };

    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc == "2.0" => Incoming::Request(request),
        Ok(request) => Incoming::Invalid(JsonRpcError::invalid_request(format!(
            "Unsupported jsonrpc version: {}",
            request.jsonrpc
        ))),
        Err(e) => Incoming::Invalid(JsonRpcError::invalid_request(format!(
            "Invalid request: {}",
            e
        ))),
    }
}

/// Async line transport, generic over the byte streams so tests can drive it
pub struct AsyncStdioTransport<R, W> {
    reader: R,
    writer: W,
}

impl AsyncStdioTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> AsyncStdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next message; `None` at EOF
    pub async fn read_message(&mut self) -> io::Result<Option<Incoming>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None); // EOF
        }

        Ok(Some(parse_line(&line)))
    }

    /// Write a JSON-RPC response as one line
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

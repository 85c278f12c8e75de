//! Line-oriented transport: JSON-RPC in on one stream, out on another.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until EOF.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve any reader/writer pair until the reader hits EOF.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(input);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(McpError::Io)?;
            if bytes_read == 0 {
                tracing::info!("EOF on input, shutting down");
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            let reply = match framing::parse_message(&line) {
                Ok(msg) => self.handler.handle_message(msg).await,
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    Some(framing::parse_failure(&e)?)
                }
            };

            if let Some(reply) = reply {
                let framed = framing::frame_message(&reply)?;
                output
                    .write_all(framed.as_bytes())
                    .await
                    .map_err(McpError::Io)?;
                output.flush().await.map_err(McpError::Io)?;
            }
        }

        Ok(())
    }
}

//! Newline-delimited JSON framing.

use serde_json::Value;

use crate::types::{JsonRpcMessage, JsonRpcReply, McpError, McpResult, RequestId};

/// Parse one line as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value as one line, trailing newline included.
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

/// The JSON-RPC error a peer gets back for a line that could not be parsed.
pub fn parse_failure(error: &McpError) -> McpResult<Value> {
    let reply = JsonRpcReply::failure(RequestId::Null, error.to_json_rpc_error());
    serde_json::to_value(reply).map_err(|e| McpError::InternalError(e.to_string()))
}

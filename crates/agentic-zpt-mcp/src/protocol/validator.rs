//! Structural checks on incoming JSON-RPC requests.

use crate::types::{JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Reject requests with the wrong protocol tag, an empty method, or a method
/// in the reserved `rpc.` namespace.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    let method = request.method.trim();
    if method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }
    if method.starts_with("rpc.") {
        return Err(McpError::InvalidRequest(format!(
            "Method '{method}' is reserved"
        )));
    }

    if let Some(params) = &request.params {
        if !(params.is_object() || params.is_array() || params.is_null()) {
            return Err(McpError::InvalidRequest(
                "params must be an object or an array".to_string(),
            ));
        }
    }

    Ok(())
}

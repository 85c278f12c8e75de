//! Error types and JSON-RPC error codes for the MCP server.

use agentic_zpt::ZptError;

use super::message::JsonRpcErrorObject;
use crate::request::ParseError;
use crate::verbs::SUPPORTED_VERBS;

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const SESSION_NOT_FOUND: i32 = -32851;
    pub const NAVIGATION_ERROR: i32 = -32852;

    /// Server: Unauthorized (missing or invalid bearer token).
    pub const UNAUTHORIZED: i32 = -32900;
}

/// All errors that can occur in the server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Request cancelled")]
    RequestCancelled,

    #[error("Unsupported tool: {0}. Supported tools: {list}", list = SUPPORTED_VERBS.join(", "))]
    ToolNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Zpt(#[from] ZptError),

    #[error(transparent)]
    Request(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Formatting failed: {0}")]
    Formatting(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid bearer token.
    #[error("Unauthorized")]
    Unauthorized,
}

impl McpError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::Request(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::RequestCancelled => REQUEST_CANCELLED,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::SessionNotFound(_) => SESSION_NOT_FOUND,
            McpError::Zpt(e) if e.field().is_some() => INVALID_PARAMS,
            McpError::Zpt(_) => NAVIGATION_ERROR,
            McpError::Unauthorized => UNAUTHORIZED,
            McpError::InternalError(_)
            | McpError::Configuration(_)
            | McpError::Formatting(_)
            | McpError::Transport(_)
            | McpError::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Error catalog code, when this error maps onto one directly.
    pub fn catalog_code(&self) -> Option<&'static str> {
        match self {
            McpError::ParseError(_) | McpError::Json(_) => Some("INVALID_JSON_BODY"),
            McpError::InvalidRequest(_) => Some("REQUEST_VALIDATION_FAILED"),
            McpError::MethodNotFound(_) => Some("ROUTE_NOT_FOUND"),
            McpError::InvalidParams(_) => Some("PARAMETER_VALIDATION_FAILED"),
            McpError::ToolNotFound(_) => Some("UNSUPPORTED_VERB"),
            McpError::SessionNotFound(_) => Some("SESSION_NOT_FOUND"),
            McpError::Zpt(e) => Some(e.code()),
            McpError::Request(e) => Some(e.code()),
            McpError::Configuration(_) => Some("INVALID_CONFIGURATION"),
            McpError::Formatting(_) => Some("FORMATTING_ERROR"),
            McpError::Unauthorized => Some("AUTHENTICATION_REQUIRED"),
            McpError::InternalError(_)
            | McpError::RequestCancelled
            | McpError::Transport(_)
            | McpError::Io(_) => None,
        }
    }

    /// Name of the offending argument, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            McpError::Zpt(e) => e.field(),
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

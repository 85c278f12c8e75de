//! Error classification, recovery, sanitization, and statistics.

pub mod catalog;
pub mod classify;
pub mod handler;
pub mod recovery;
pub mod sanitize;
pub mod taxonomy;

use serde_json::Value;

use agentic_zpt::ZptError;

use crate::request::ParseError;
use crate::types::McpError;

pub use classify::classify;
pub use handler::{ErrorHandler, ErrorOutcome, ErrorRecord, ErrorStats};
pub use recovery::{RecoveryOutcome, RecoveryStrategy};
pub use taxonomy::{Category, ErrorType, Severity};

/// A failure as the classifier sees it: a message plus whatever structure
/// the raising component attached.
#[derive(Debug, Clone, Default)]
pub struct RaisedError {
    pub message: String,
    pub code: Option<String>,
    pub field: Option<String>,
    pub details: Option<Value>,
    pub cause: Option<String>,
}

impl RaisedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&ZptError> for RaisedError {
    fn from(e: &ZptError) -> Self {
        Self {
            message: e.to_string(),
            code: Some(e.code().to_string()),
            field: e.field().map(str::to_string),
            details: None,
            cause: Some(format!("{e:?}")),
        }
    }
}

impl From<&ParseError> for RaisedError {
    fn from(e: &ParseError) -> Self {
        Self {
            message: e.to_string(),
            code: Some(e.code().to_string()),
            field: None,
            details: e.details(),
            cause: None,
        }
    }
}

impl From<&McpError> for RaisedError {
    fn from(e: &McpError) -> Self {
        match e {
            McpError::Zpt(inner) => inner.into(),
            McpError::Request(inner) => inner.into(),
            other => Self {
                message: other.to_string(),
                code: other.catalog_code().map(str::to_string),
                field: other.field().map(str::to_string),
                details: None,
                cause: None,
            },
        }
    }
}

/// Per-request facts the handler may consult.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub verb: Option<String>,
    pub path: Option<String>,
    /// Explicit HTTP status set by the caller (404 and 429 are honoured).
    pub status_override: Option<u16>,
}

impl ErrorContext {
    pub fn for_verb(verb: &str) -> Self {
        Self {
            verb: Some(verb.to_string()),
            ..Default::default()
        }
    }
}

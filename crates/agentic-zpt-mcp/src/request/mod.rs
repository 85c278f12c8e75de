//! Inbound request normalization and validation.

pub mod body;
pub mod multipart;
pub mod parser;
pub mod validators;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use body::{body_to_args, parse_body};
pub use parser::{read_body, RequestParser};

/// A request body as a stream of byte chunks.
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Only these methods get their body read and parsed.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as it arrives from a transport, before any validation.
pub struct RawRequest {
    pub method: String,
    /// Path plus optional `?query`.
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<BodyStream>,
    pub remote_addr: Option<SocketAddr>,
    pub http_version: String,
    pub secure: bool,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: None,
            remote_addr: None,
            http_version: "HTTP/1.1".to_string(),
            secure: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach an in-memory body as a single-chunk stream.
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        let chunk: Bytes = body.into();
        self.with_stream(Box::pin(futures::stream::once(async move { Ok(chunk) })))
    }

    pub fn with_stream(mut self, stream: BodyStream) -> Self {
        self.body = Some(stream);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// First header value with a case-insensitive name match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn path(&self) -> &str {
        self.uri.split_once('?').map(|(p, _)| p).unwrap_or(&self.uri)
    }

    pub fn query_string(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, q)| q)
    }
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers.len())
            .field("has_body", &self.body.is_some())
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

/// One or more values for a repeated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    pub fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                let first = std::mem::take(first);
                *self = QueryValue::Multiple(vec![first, value]);
            }
            QueryValue::Multiple(values) => values.push(value),
        }
    }

    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(v) => v,
            QueryValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            QueryValue::Single(v) => json!(v),
            QueryValue::Multiple(values) => json!(values),
        }
    }
}

/// Ordered key/value pairs with repeated keys accumulated.
pub type ParamMap = IndexMap<String, QueryValue>;

pub(crate) fn accumulate(map: &mut ParamMap, key: String, value: String) {
    match map.get_mut(&key) {
        Some(existing) => existing.push(value),
        None => {
            map.insert(key, QueryValue::Single(value));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(ParamMap),
    Multipart {
        fields: IndexMap<String, String>,
        files: Vec<UploadedFile>,
    },
    Text(String),
    Raw(Bytes),
    Absent,
}

impl RequestBody {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "json",
            RequestBody::Form(_) => "form",
            RequestBody::Multipart { .. } => "multipart",
            RequestBody::Text(_) => "text",
            RequestBody::Raw(_) => "raw",
            RequestBody::Absent => "absent",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RequestBody::Absent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub forwarded_for: Vec<String>,
    pub protocol: String,
    pub secure: bool,
    pub http_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Warning,
}

/// A single validator finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub validator: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl ValidationIssue {
    pub fn critical(validator: &str, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_string(),
            message: message.into(),
            severity: IssueSeverity::Critical,
        }
    }

    pub fn warning(validator: &str, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_string(),
            message: message.into(),
            severity: IssueSeverity::Warning,
        }
    }

    /// Critical when `strict`, a warning otherwise.
    pub fn strict(validator: &str, message: impl Into<String>, strict: bool) -> Self {
        if strict {
            Self::critical(validator, message)
        } else {
            Self::warning(validator, message)
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == IssueSeverity::Critical
    }
}

/// The canonical form every transport hands to the dispatcher.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: ParamMap,
    pub headers: IndexMap<String, String>,
    pub body: RequestBody,
    pub cookies: IndexMap<String, String>,
    pub client: ClientInfo,
    pub warnings: Vec<ValidationIssue>,
}

impl NormalizedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(QueryValue::first)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Fatal request parsing failures.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Request validation failed: {}", summarize(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error("Request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    #[error("Request body read timed out after {0:?}")]
    BodyTimeout(Duration),

    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),

    #[error("Multipart content type is missing a boundary")]
    MissingBoundary,

    #[error("Invalid multipart body: {0}")]
    MalformedMultipart(String),

    #[error("Invalid body encoding: {0}")]
    InvalidEncoding(String),

    #[error("Failed to read request body: {0}")]
    BodyRead(#[from] std::io::Error),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Validation { .. } => "REQUEST_VALIDATION_FAILED",
            ParseError::BodyTooLarge { .. } => "REQUEST_TOO_LARGE",
            ParseError::BodyTimeout(_) => "REQUEST_TIMEOUT",
            ParseError::MalformedJson(_) => "INVALID_JSON_BODY",
            ParseError::MissingBoundary => "MISSING_MULTIPART_BOUNDARY",
            ParseError::MalformedMultipart(_) => "INVALID_MULTIPART_BODY",
            ParseError::InvalidEncoding(_) => "INVALID_BODY_ENCODING",
            ParseError::BodyRead(_) => "PROCESSING_FAILED",
        }
    }

    /// Structured details safe to expose to the caller.
    pub fn details(&self) -> Option<Value> {
        match self {
            ParseError::Validation { issues } => Some(json!({ "issues": issues })),
            ParseError::BodyTooLarge { limit } => Some(json!({ "maxBodySize": limit })),
            ParseError::BodyTimeout(after) => Some(json!({ "timeoutMs": after.as_millis() as u64 })),
            _ => None,
        }
    }
}

//! Shape-dispatched response formatting.

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;

use super::envelope::{
    ErrorBody, ErrorEnvelope, PageRequest, ResponseEnvelope, ResponseMetadata, ResponseType,
    SuccessEnvelope,
};
use super::postprocess::{compress, links};
use super::sanitize::sanitize_data;
use super::{shapes, FormatError};
use crate::config::ResponseConfig;
use crate::errors::{catalog, ErrorOutcome, ErrorType};

/// Per-request formatting inputs.
#[derive(Debug, Clone)]
pub struct FormatContext {
    pub request_id: String,
    pub session_id: Option<String>,
    pub verb: Option<String>,
    pub path: Option<String>,
    /// Overrides the configured default when set.
    pub include_links: Option<bool>,
    pub compress: Option<bool>,
    pub pagination: Option<PageRequest>,
    pub started: Instant,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            session_id: None,
            verb: None,
            path: None,
            include_links: None,
            compress: None,
            pagination: None,
            started: Instant::now(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

pub struct ResponseFormatter {
    version: String,
    include_links: bool,
    compress: bool,
}

impl ResponseFormatter {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            version: config.api_version.clone(),
            include_links: config.include_links,
            compress: config.compress,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Format any payload. Never fails: an internal problem yields a
    /// FORMATTING_ERROR envelope instead.
    pub fn format(&self, data: &Value, ctx: &FormatContext) -> ResponseEnvelope {
        match self.try_format(data, ctx) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id, "Formatting failed: {e}");
                self.formatting_error(&e, ctx)
            }
        }
    }

    fn try_format(&self, data: &Value, ctx: &FormatContext) -> Result<ResponseEnvelope, FormatError> {
        let data = sanitize_data(data);
        let kind = shapes::detect(&data);

        let body = match kind {
            ResponseType::Error => return Ok(ResponseEnvelope::Error(self.error_from_data(&data, ctx))),
            ResponseType::Navigation => shapes::navigation(&data)?,
            ResponseType::Preview => shapes::preview(&data)?,
            ResponseType::Options => shapes::options(&data)?,
            ResponseType::Schema => shapes::schema(&data, &self.version)?,
            ResponseType::Health => shapes::health(&data)?,
            ResponseType::Metrics => shapes::metrics(&data)?,
            ResponseType::Success => data,
        };

        let body = if self.wants_compress(ctx) { compress(body) } else { body };

        Ok(ResponseEnvelope::Success(SuccessEnvelope {
            success: true,
            data: body,
            metadata: self.metadata(kind, ctx),
            request_id: ctx.request_id.clone(),
            version: self.version.clone(),
            pagination: ctx.pagination.map(Into::into),
            links: self
                .wants_links(ctx)
                .then(|| links(kind, ctx.path.as_deref(), ctx.verb.as_deref())),
        }))
    }

    /// Envelope for a failure that went through the error handler.
    pub fn format_error(&self, outcome: &ErrorOutcome, ctx: &FormatContext) -> ResponseEnvelope {
        let record = &outcome.record;
        let mut recovery = outcome.recovery.clone();
        if let Some(r) = recovery.as_mut() {
            r.data = r.data.take().map(|d| sanitize_data(&d));
        }

        let details = record.metadata.details.as_ref().map(sanitize_data);
        let details = if self.wants_compress(ctx) { details.map(compress) } else { details };

        ResponseEnvelope::Error(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                id: record.id.clone(),
                code: record.code.clone(),
                error_type: record.error_type,
                message: record.message.clone(),
                status_code: record.status_code,
                field: record.metadata.field.clone(),
                severity: record.severity,
                category: record.category,
                timestamp: record.timestamp,
                numeric_code: record.numeric_code,
                details,
            },
            recovery,
            suggestions: outcome.suggestions.clone(),
            request_id: ctx.request_id.clone(),
            version: self.version.clone(),
            metadata: self.metadata(ResponseType::Error, ctx),
            links: self
                .wants_links(ctx)
                .then(|| links(ResponseType::Error, ctx.path.as_deref(), ctx.verb.as_deref())),
        })
    }

    /// Error-shaped payload that did not pass through the handler.
    fn error_from_data(&self, data: &Value, ctx: &FormatContext) -> ErrorEnvelope {
        let error = data.get("error");
        let code = error
            .and_then(|e| e.get("code"))
            .or_else(|| data.get("code"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        let message = error
            .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .unwrap_or("Request failed");

        let entry = catalog::lookup(code);
        let error_type = entry.map(|e| e.error_type).unwrap_or(ErrorType::Unknown);
        let info = error_type.info();

        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                id: uuid::Uuid::new_v4().to_string(),
                code: entry.map(|e| e.code).unwrap_or("UNKNOWN").to_string(),
                error_type,
                message: message.to_string(),
                status_code: info.status_code,
                field: error
                    .and_then(|e| e.get("field"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                severity: info.severity,
                category: info.category,
                timestamp: Utc::now(),
                numeric_code: entry.map(|e| e.number),
                details: None,
            },
            recovery: None,
            suggestions: error_type.suggestions().iter().map(|s| s.to_string()).collect(),
            request_id: ctx.request_id.clone(),
            version: self.version.clone(),
            metadata: self.metadata(ResponseType::Error, ctx),
            links: None,
        }
    }

    fn formatting_error(&self, err: &FormatError, ctx: &FormatContext) -> ResponseEnvelope {
        let error_type = ErrorType::Processing;
        let info = error_type.info();
        ResponseEnvelope::Error(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                id: uuid::Uuid::new_v4().to_string(),
                code: "FORMATTING_ERROR".to_string(),
                error_type,
                message: err.to_string(),
                status_code: info.status_code,
                field: None,
                severity: info.severity,
                category: info.category,
                timestamp: Utc::now(),
                numeric_code: catalog::lookup("FORMATTING_ERROR").map(|e| e.number),
                details: None,
            },
            recovery: None,
            suggestions: error_type.suggestions().iter().map(|s| s.to_string()).collect(),
            request_id: ctx.request_id.clone(),
            version: self.version.clone(),
            metadata: self.metadata(ResponseType::Error, ctx),
            links: None,
        })
    }

    fn metadata(&self, kind: ResponseType, ctx: &FormatContext) -> ResponseMetadata {
        ResponseMetadata {
            timestamp: Utc::now(),
            response_type: kind,
            processing_time_ms: ctx.started.elapsed().as_millis() as u64,
            session_id: ctx.session_id.clone(),
            verb: ctx.verb.clone(),
        }
    }

    fn wants_links(&self, ctx: &FormatContext) -> bool {
        ctx.include_links.unwrap_or(self.include_links)
    }

    fn wants_compress(&self, ctx: &FormatContext) -> bool {
        ctx.compress.unwrap_or(self.compress)
    }
}

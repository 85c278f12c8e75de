//! One recovery strategy per recoverable error type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use agentic_zpt::types::MAX_TOKENS_LIMIT;
use agentic_zpt::{TiltStyle, ZoomLevel};

use super::handler::ErrorRecord;
use super::taxonomy::ErrorType;
use super::ErrorContext;
use crate::types::McpResult;
use crate::verbs::{VerbRegistry, SUPPORTED_VERBS};

const RATE_LIMIT_RETRY_SECS: u64 = 60;
const TIMEOUT_RETRY_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub recovered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RecoveryOutcome {
    pub fn not_recovered() -> Self {
        Self {
            recovered: false,
            message: None,
            data: None,
        }
    }

    pub fn recovered(message: impl Into<String>, data: Value) -> Self {
        Self {
            recovered: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    async fn attempt(
        &self,
        record: &ErrorRecord,
        context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome>;
}

struct ValidationRecovery;
struct ParameterRecovery;
struct RateLimitRecovery;
struct CorpusRecovery;
struct ProcessingRecovery;
struct TimeoutRecovery;
struct ExternalServiceRecovery;

static VALIDATION: ValidationRecovery = ValidationRecovery;
static PARAMETER: ParameterRecovery = ParameterRecovery;
static RATE_LIMIT: RateLimitRecovery = RateLimitRecovery;
static CORPUS: CorpusRecovery = CorpusRecovery;
static PROCESSING: ProcessingRecovery = ProcessingRecovery;
static TIMEOUT: TimeoutRecovery = TimeoutRecovery;
static EXTERNAL_SERVICE: ExternalServiceRecovery = ExternalServiceRecovery;

/// The strategy registered for a type, if it is recoverable.
pub fn strategy_for(error_type: ErrorType) -> Option<&'static dyn RecoveryStrategy> {
    match error_type {
        ErrorType::Validation => Some(&VALIDATION),
        ErrorType::Parameter => Some(&PARAMETER),
        ErrorType::RateLimit => Some(&RATE_LIMIT),
        ErrorType::Corpus => Some(&CORPUS),
        ErrorType::Processing => Some(&PROCESSING),
        ErrorType::Timeout => Some(&TIMEOUT),
        ErrorType::ExternalService => Some(&EXTERNAL_SERVICE),
        ErrorType::Authentication
        | ErrorType::Authorization
        | ErrorType::NotFound
        | ErrorType::Resource
        | ErrorType::Configuration
        | ErrorType::Unknown => None,
    }
}

#[async_trait]
impl RecoveryStrategy for ValidationRecovery {
    async fn attempt(
        &self,
        record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        let outcome = match record.code.as_str() {
            "INVALID_ZOOM_LEVEL" => RecoveryOutcome::recovered(
                "Use one of the valid zoom levels; 'unit' is the default",
                json!({
                    "validZoomLevels": ZoomLevel::names(),
                    "suggestedZoom": ZoomLevel::default().as_str(),
                }),
            ),
            "INVALID_TILT_REPRESENTATION" => RecoveryOutcome::recovered(
                "Use one of the valid tilt styles; 'keywords' is the default",
                json!({
                    "validTiltStyles": TiltStyle::names(),
                    "suggestedTilt": TiltStyle::default().as_str(),
                }),
            ),
            "INVALID_PAN_FILTER" => RecoveryOutcome::recovered(
                "Pan filters must follow the documented shapes",
                json!({
                    "validPanFilters": ["domains", "keywords", "entities", "temporal", "geographic"],
                    "example": {
                        "domains": ["project"],
                        "keywords": ["rust"],
                        "temporal": { "start": "2024-01-01", "end": "2024-12-31" },
                        "geographic": { "center": { "lat": 51.5, "lon": -0.12 }, "radius": 25.0 },
                    },
                }),
            ),
            "INVALID_TRANSFORM_OPTIONS" => RecoveryOutcome::recovered(
                "Transform options must stay within the documented limits",
                json!({
                    "limits": { "maxTokens": { "min": 1, "max": MAX_TOKENS_LIMIT } },
                    "formats": ["json", "markdown", "structured"],
                    "tokenizers": ["cl100k", "p50k", "claude", "llama"],
                    "chunkStrategies": ["semantic", "adaptive", "fixed", "sentence"],
                }),
            ),
            "UNSUPPORTED_VERB" => RecoveryOutcome::recovered(
                "Call one of the supported verbs",
                json!({ "supportedVerbs": SUPPORTED_VERBS }),
            ),
            "INVALID_QUERY" => RecoveryOutcome::recovered(
                "Provide a non-empty query",
                json!({ "hint": "query must be a non-empty string" }),
            ),
            _ => RecoveryOutcome::not_recovered(),
        };
        Ok(outcome)
    }
}

#[async_trait]
impl RecoveryStrategy for ParameterRecovery {
    async fn attempt(
        &self,
        record: &ErrorRecord,
        context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        let field = record.metadata.field.clone();
        let schema = context
            .verb
            .as_deref()
            .and_then(VerbRegistry::definition)
            .map(|d| d.input_schema);

        if field.is_none() && schema.is_none() {
            return Ok(RecoveryOutcome::not_recovered());
        }

        let message = match (&field, record.code.as_str()) {
            (Some(f), "MISSING_REQUIRED_PARAMETER") => format!("Supply the missing parameter '{f}'"),
            (Some(f), _) => format!("Correct the parameter '{f}'"),
            (None, _) => "Correct the arguments to match the verb schema".to_string(),
        };
        Ok(RecoveryOutcome::recovered(
            message,
            json!({ "field": field, "expected": schema }),
        ))
    }
}

#[async_trait]
impl RecoveryStrategy for RateLimitRecovery {
    async fn attempt(
        &self,
        _record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        Ok(RecoveryOutcome::recovered(
            format!("Retry after {RATE_LIMIT_RETRY_SECS} seconds"),
            json!({ "retryAfterSecs": RATE_LIMIT_RETRY_SECS }),
        ))
    }
}

#[async_trait]
impl RecoveryStrategy for CorpusRecovery {
    async fn attempt(
        &self,
        record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        if record.code == "NO_RECENT_INTERACTIONS" {
            return Ok(RecoveryOutcome::recovered(
                "Record interactions with tell before deriving a topic",
                json!({ "requiredVerb": "tell" }),
            ));
        }
        Ok(RecoveryOutcome::recovered(
            "Corpus unavailable; returning an empty selection",
            json!({ "fallback": "empty", "results": [] }),
        ))
    }
}

#[async_trait]
impl RecoveryStrategy for ProcessingRecovery {
    async fn attempt(
        &self,
        _record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        Ok(RecoveryOutcome::recovered(
            "Retry with a smaller, simpler transform",
            json!({
                "suggestedTransform": { "maxTokens": 2000, "chunkStrategy": "fixed", "format": "json" },
            }),
        ))
    }
}

#[async_trait]
impl RecoveryStrategy for TimeoutRecovery {
    async fn attempt(
        &self,
        _record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        Ok(RecoveryOutcome::recovered(
            "The operation may succeed on retry",
            json!({ "retryable": true, "retryAfterSecs": TIMEOUT_RETRY_SECS }),
        ))
    }
}

#[async_trait]
impl RecoveryStrategy for ExternalServiceRecovery {
    async fn attempt(
        &self,
        _record: &ErrorRecord,
        _context: &ErrorContext,
    ) -> McpResult<RecoveryOutcome> {
        Ok(RecoveryOutcome::recovered(
            "Continuing is possible with local capabilities only",
            json!({ "degraded": true, "fallback": "local" }),
        ))
    }
}

//! The request backbone: parse, dispatch, classify, format.

use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use agentic_zpt::{TiltStyle, TransformOptions, ZoomLevel};

use crate::config::ZptConfig;
use crate::errors::{ErrorContext, ErrorHandler, RaisedError};
use crate::request::{body_to_args, NormalizedRequest, RawRequest, RequestParser};
use crate::response::{FormatContext, ResponseEnvelope, ResponseFormatter};
use crate::session::{SessionRegistry, ZptServices, DEFAULT_SESSION_ID};
use crate::types::McpError;
use crate::verbs::{VerbRegistry, SUPPORTED_VERBS};

pub const SESSION_HEADER: &str = "x-session-id";
pub const SESSION_COOKIE: &str = "zpt_session";
pub const SESSION_PARAM: &str = "session";
pub const LINKS_PARAM: &str = "links";
pub const COMPRESS_PARAM: &str = "compress";

/// Everything one request needs, shared across transports.
pub struct ZptService {
    config: ZptConfig,
    parser: RequestParser,
    sessions: SessionRegistry,
    errors: ErrorHandler,
    formatter: ResponseFormatter,
    started: Instant,
}

impl ZptService {
    pub fn new(config: ZptConfig) -> Self {
        let services = ZptServices::local(&config);
        Self::with_services(config, services)
    }

    pub fn with_services(config: ZptConfig, services: ZptServices) -> Self {
        Self {
            parser: RequestParser::new(config.request.clone()),
            sessions: SessionRegistry::new(std::sync::Arc::new(services)),
            errors: ErrorHandler::new(config.errors.clone()),
            formatter: ResponseFormatter::new(&config.response),
            started: Instant::now(),
            config,
        }
    }

    /// Replace the request parser, e.g. to shorten the body timeout.
    pub fn with_parser(mut self, parser: RequestParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ZptConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn formatter(&self) -> &ResponseFormatter {
        &self.formatter
    }

    /// Run one verb against a session and shape the outcome.
    pub async fn call_verb(
        &self,
        session_id: &str,
        verb: &str,
        args: Option<Value>,
        ctx: FormatContext,
    ) -> ResponseEnvelope {
        let ctx = ctx.with_session(session_id).with_verb(verb);
        let session = self.sessions.get_or_create(session_id).await;
        let command = VerbRegistry::execute(verb, args, &session).await;

        if command.success {
            let data = command.result.unwrap_or(Value::Null);
            return self.formatter.format(&data, &ctx);
        }

        let raised = command
            .cause
            .unwrap_or_else(|| RaisedError::new(command.error.unwrap_or_default()));
        self.fail(&raised, &ctx, None).await
    }

    /// Parse a raw request addressed to `verb` and run it.
    pub async fn handle_verb_request(&self, verb: &str, raw: RawRequest) -> ResponseEnvelope {
        let ctx = FormatContext::new().with_verb(verb).with_path(raw.path());
        let request = match self.parser.parse(raw).await {
            Ok(r) => r,
            Err(e) => return self.fail(&RaisedError::from(&e), &ctx, None).await,
        };

        let ctx = apply_output_flags(ctx, &request);
        let session_id = session_id_for(&request);
        let args = body_to_args(&request.body, &request.query);
        self.call_verb(&session_id, verb, Some(args), ctx).await
    }

    /// Estimate a navigation without changing the session.
    pub async fn preview(&self, raw: RawRequest) -> ResponseEnvelope {
        let ctx = FormatContext::new().with_path(raw.path());
        let request = match self.parser.parse(raw).await {
            Ok(r) => r,
            Err(e) => return self.fail(&RaisedError::from(&e), &ctx, None).await,
        };
        let session_id = session_id_for(&request);
        let ctx = apply_output_flags(ctx, &request).with_session(&session_id);
        let args = body_to_args(&request.body, &request.query);

        match self.run_preview(&session_id, args).await {
            Ok(data) => self.formatter.format(&data, &ctx),
            Err(e) => self.fail(&RaisedError::from(&e), &ctx, None).await,
        }
    }

    async fn run_preview(&self, session_id: &str, args: Value) -> Result<Value, McpError> {
        #[derive(Deserialize)]
        struct PreviewArgs {
            #[serde(default)]
            query: Option<String>,
            #[serde(default)]
            zoom: Option<String>,
            #[serde(default)]
            tilt: Option<String>,
            #[serde(default)]
            transform: Option<TransformOptions>,
        }

        let args: PreviewArgs =
            serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

        let session = self.sessions.get_or_create(session_id).await;
        let session = session.lock().await;

        let mut params = session.state().zpt.clone();
        if let Some(zoom) = args.zoom.as_deref() {
            params.zoom = ZoomLevel::parse(zoom.trim())?;
        }
        if let Some(tilt) = args.tilt.as_deref() {
            params.tilt = TiltStyle::parse(tilt.trim())?;
        }
        if let Some(transform) = args.transform {
            transform.validate()?;
            params.transform = transform;
        }

        let preview = session.preview(&params, args.query.as_deref()).await?;
        Ok(json!({ "preview": preview }))
    }

    pub fn options(&self, ctx: FormatContext) -> ResponseEnvelope {
        let data = json!({
            "options": {
                "zoomLevels": ZoomLevel::names(),
                "tiltStyles": TiltStyle::names(),
                "panFilters": ["domains", "keywords", "entities", "temporal", "geographic"],
                "formats": ["json", "markdown", "structured"],
                "tokenizers": ["cl100k", "p50k", "claude", "llama"],
                "chunkStrategies": ["semantic", "adaptive", "fixed", "sentence"],
                "verbs": SUPPORTED_VERBS,
            }
        });
        self.formatter.format(&data, &ctx)
    }

    pub fn schema(&self, ctx: FormatContext) -> ResponseEnvelope {
        let verbs: Map<String, Value> = VerbRegistry::list_verbs()
            .into_iter()
            .map(|d| (d.name, d.input_schema))
            .collect();
        let data = json!({
            "schema": {
                "verbs": verbs,
                "navigation": {
                    "zoom": { "type": "string", "enum": ZoomLevel::names() },
                    "tilt": { "type": "string", "enum": TiltStyle::names() },
                    "transform": {
                        "maxTokens": { "type": "integer", "minimum": 1, "maximum": agentic_zpt::MAX_TOKENS_LIMIT },
                        "format": ["json", "markdown", "structured"],
                        "tokenizer": ["cl100k", "p50k", "claude", "llama"],
                        "chunkStrategy": ["semantic", "adaptive", "fixed", "sentence"],
                        "includeMetadata": { "type": "boolean" }
                    }
                }
            }
        });
        self.formatter.format(&data, &ctx)
    }

    pub async fn health(&self, ctx: FormatContext) -> ResponseEnvelope {
        let recovery = if self.config.errors.enable_recovery {
            "enabled"
        } else {
            "disabled"
        };
        let data = json!({
            "status": "ok",
            "uptimeSecs": self.started.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
            "sessions": self.sessions.count().await,
            "checks": {
                "sessions": "ok",
                "errorHandler": "ok",
                "recovery": recovery,
            },
        });
        self.formatter.format(&data, &ctx)
    }

    pub async fn metrics(&self, ctx: FormatContext) -> ResponseEnvelope {
        let data = json!({
            "metrics": {
                "uptimeSecs": self.started.elapsed().as_secs(),
                "sessions": self.sessions.count().await,
                "errors": self.errors.stats(),
            }
        });
        self.formatter.format(&data, &ctx)
    }

    /// Classify, recover, count, and shape a failure.
    pub async fn fail(
        &self,
        error: &RaisedError,
        ctx: &FormatContext,
        status_override: Option<u16>,
    ) -> ResponseEnvelope {
        let error_ctx = ErrorContext {
            request_id: Some(ctx.request_id.clone()),
            session_id: ctx.session_id.clone(),
            verb: ctx.verb.clone(),
            path: ctx.path.clone(),
            status_override,
        };
        let outcome = self.errors.handle_error(error, &error_ctx).await;
        self.formatter.format_error(&outcome, ctx)
    }

    /// Envelope for a failure raised outside the verb path.
    pub async fn fail_with(&self, error: &McpError, ctx: &FormatContext) -> ResponseEnvelope {
        self.fail(&RaisedError::from(error), ctx, None).await
    }
}

/// Session id: header, then cookie, then query parameter, then the default.
pub fn session_id_for(request: &NormalizedRequest) -> String {
    request
        .header(SESSION_HEADER)
        .or_else(|| request.cookie(SESSION_COOKIE))
        .or_else(|| request.query_param(SESSION_PARAM))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

/// `?links=` and `?compress=` override the configured post-processing.
fn apply_output_flags(mut ctx: FormatContext, request: &NormalizedRequest) -> FormatContext {
    let flag = |name: &str| {
        request
            .query_param(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
    };
    if let Some(links) = flag(LINKS_PARAM) {
        ctx.include_links = Some(links);
    }
    if let Some(compress) = flag(COMPRESS_PARAM) {
        ctx.compress = Some(compress);
    }
    ctx
}

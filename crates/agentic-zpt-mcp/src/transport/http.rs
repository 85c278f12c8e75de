//! HTTP transport: REST routes for the verbs plus JSON-RPC on `/mcp`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, Path, Request, State},
    http::{HeaderValue, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use futures::TryStreamExt;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::protocol::ProtocolHandler;
use crate::request::RawRequest;
use crate::response::{FormatContext, ResponseEnvelope};
use crate::service::ZptService;
use crate::types::{McpError, McpResult};

use super::framing;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state for every route.
pub struct ServerState {
    pub token: Option<String>,
    pub service: Arc<ZptService>,
    pub handler: ProtocolHandler,
}

impl ServerState {
    pub fn new(service: Arc<ZptService>, token: Option<String>) -> Self {
        Self {
            token,
            handler: ProtocolHandler::new(service.clone()),
            service,
        }
    }
}

/// HTTP transport for web clients.
pub struct HttpTransport {
    state: Arc<ServerState>,
}

impl HttpTransport {
    pub fn new(service: Arc<ZptService>, token: Option<String>) -> Self {
        Self {
            state: Arc::new(ServerState::new(service, token)),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve on `addr` until Ctrl-C.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Build the router. `/health` and the fallback skip authentication.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.service.config().request.max_body_size;

    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/api/zpt/options", get(handle_options))
        .route("/api/zpt/schema", get(handle_schema))
        .route("/api/zpt/preview", post(handle_preview))
        .route("/api/verbs/:verb", any(handle_verb))
        .route("/mcp", post(handle_rpc))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(cors),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Bearer token check, when a token is configured.
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated request");
            let ctx = context_for(request.uri());
            let envelope = state.service.fail_with(&McpError::Unauthorized, &ctx).await;
            return envelope_response(envelope);
        }
    }

    next.run(request).await
}

async fn handle_health(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    envelope_response(state.service.health(context_for(&uri)).await)
}

async fn handle_metrics(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    envelope_response(state.service.metrics(context_for(&uri)).await)
}

async fn handle_options(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    envelope_response(state.service.options(context_for(&uri)))
}

async fn handle_schema(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    envelope_response(state.service.schema(context_for(&uri)))
}

async fn handle_preview(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let raw = raw_request(request);
    envelope_response(state.service.preview(raw).await)
}

async fn handle_verb(
    State(state): State<Arc<ServerState>>,
    Path(verb): Path<String>,
    request: Request,
) -> Response {
    let raw = raw_request(request);
    envelope_response(state.service.handle_verb_request(&verb, raw).await)
}

async fn handle_not_found(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let ctx = context_for(&uri);
    let error = McpError::MethodNotFound(uri.path().to_string());
    envelope_response(state.service.fail_with(&error, &ctx).await)
}

/// JSON-RPC over a single POST. Notifications answer 202 with no body.
async fn handle_rpc(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let message = std::str::from_utf8(&body)
        .map_err(|e| McpError::ParseError(e.to_string()))
        .and_then(framing::parse_message);

    match message {
        Ok(msg) => match state.handler.handle_message(msg).await {
            Some(reply) => Json(reply).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
        Err(e) => match framing::parse_failure(&e) {
            Ok(reply) => (StatusCode::BAD_REQUEST, Json(reply)).into_response(),
            Err(_) => StatusCode::BAD_REQUEST.into_response(),
        },
    }
}

fn context_for(uri: &Uri) -> FormatContext {
    FormatContext::new().with_path(uri.path())
}

/// Hand an axum request to the request parser, body still streaming.
fn raw_request(request: Request) -> RawRequest {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut raw = RawRequest::new(parts.method.as_str(), uri);
    raw.http_version = format!("{:?}", parts.version);
    raw.secure = parts.uri.scheme_str() == Some("https");
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(v) => raw.headers.push((name.as_str().to_string(), v.to_string())),
            Err(_) => tracing::debug!(header = %name, "Dropping non-ASCII header value"),
        }
    }
    if let Some(addr) = remote {
        raw = raw.with_remote_addr(addr);
    }

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    raw.with_stream(Box::pin(stream))
}

fn envelope_response(envelope: ResponseEnvelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = HeaderValue::from_str(envelope.request_id()).ok();

    let mut response = (status, Json(envelope)).into_response();
    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

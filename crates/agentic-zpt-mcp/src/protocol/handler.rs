//! JSON-RPC dispatcher: routes MCP methods onto the ZPT service.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::response::FormatContext;
use crate::service::{ZptService, SESSION_PARAM};
use crate::session::DEFAULT_SESSION_ID;
use crate::types::*;
use crate::verbs::VerbRegistry;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Dispatches incoming JSON-RPC messages for one client connection.
pub struct ProtocolHandler {
    service: Arc<ZptService>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
}

impl ProtocolHandler {
    pub fn new(service: Arc<ZptService>) -> Self {
        Self {
            service,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
        }
    }

    pub fn service(&self) -> &Arc<ZptService> {
        &self.service
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            JsonRpcMessage::ClientReply { id } => {
                tracing::warn!(?id, "Dropping unsolicited reply from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return self.error_reply(&e, request.id).await;
        }

        let id = request.id.clone();
        match self.dispatch_request(&request).await {
            Ok(value) => JsonRpcReply::success(id, value).to_value(),
            Err(e) => self.error_reply(&e, id).await,
        }
    }

    /// A JSON-RPC error whose `data` is the classified error envelope.
    async fn error_reply(&self, error: &McpError, id: RequestId) -> Value {
        let envelope = self.service.fail_with(error, &FormatContext::new()).await;
        let mut body = error.to_json_rpc_error();
        body.data = Some(envelope.to_value());
        JsonRpcReply::failure(id, body).to_value()
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "shutdown" => self.handle_shutdown().await,

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            "ping" => Ok(Value::Object(serde_json::Map::new())),

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                let mut caps = self.capabilities.lock().await;
                caps.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                let reason = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelRequestParams>(p).ok())
                    .and_then(|p| p.reason);
                tracing::info!(?reason, "Received cancellation notification");
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init_params);

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        let sessions = self.service.sessions().count().await;
        tracing::info!(sessions, "Shutdown requested");
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: VerbRegistry::list_verbs(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    /// Verb failures still answer with a result; the envelope carries the error.
    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let (session_id, arguments) = split_session(call_params.arguments);
        let envelope = self
            .service
            .call_verb(&session_id, &call_params.name, arguments, FormatContext::new())
            .await;

        let result = if envelope.is_success() {
            ToolCallResult::json(&envelope)
        } else {
            ToolCallResult::json_error(&envelope)
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}

/// Pull the optional `session` argument out of a tool call.
fn split_session(arguments: Option<Value>) -> (String, Option<Value>) {
    match arguments {
        Some(Value::Object(mut map)) => {
            let session = map
                .remove(SESSION_PARAM)
                .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
            (session, Some(Value::Object(map)))
        }
        other => (DEFAULT_SESSION_ID.to_string(), other),
    }
}

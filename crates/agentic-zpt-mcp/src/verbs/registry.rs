//! Verb registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::RaisedError;
use crate::session::ZptSessionManager;
use crate::types::{McpError, McpResult, ToolDefinition};

use super::{
    ask, augment, derive_topic, fade_memory, forget, inspect, pan, project_context, recall,
    remember, tell, tilt, zoom,
};

/// The fixed verb surface.
pub const SUPPORTED_VERBS: [&str; 12] = [
    "tell",
    "ask",
    "augment",
    "zoom",
    "pan",
    "tilt",
    "inspect",
    "remember",
    "forget",
    "recall",
    "project_context",
    "fade_memory",
];

/// Auxiliary operation accepted by `execute` but not part of the verb list.
pub const DERIVE_TOPIC: &str = "derive_topic";

/// Uniform verb outcome. A failure keeps its typed cause for the error
/// handler; the cause is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub verb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub cause: Option<RaisedError>,
}

impl CommandResult {
    fn ok(verb: &str, result: Value) -> Self {
        Self {
            success: true,
            verb: verb.to_string(),
            result: Some(result),
            error: None,
            args: None,
            timestamp: Utc::now(),
            cause: None,
        }
    }

    fn failed(verb: &str, args: Value, error: &McpError) -> Self {
        Self {
            success: false,
            verb: verb.to_string(),
            result: None,
            error: Some(error.to_string()),
            args: Some(args),
            timestamp: Utc::now(),
            cause: Some(RaisedError::from(error)),
        }
    }
}

pub struct VerbRegistry;

impl VerbRegistry {
    /// Definitions for the 12 verbs plus `derive_topic`.
    pub fn list_verbs() -> Vec<ToolDefinition> {
        vec![
            tell::definition(),
            ask::definition(),
            augment::definition(),
            zoom::definition(),
            pan::definition(),
            tilt::definition(),
            inspect::definition(),
            remember::definition(),
            forget::definition(),
            recall::definition(),
            project_context::definition(),
            fade_memory::definition(),
            derive_topic::definition(),
        ]
    }

    pub fn definition(name: &str) -> Option<ToolDefinition> {
        Self::list_verbs().into_iter().find(|d| d.name == name)
    }

    pub fn is_supported(name: &str) -> bool {
        name == DERIVE_TOPIC || SUPPORTED_VERBS.contains(&name)
    }

    /// Run one verb against a session. Never fails: errors come back as an
    /// unsuccessful result.
    pub async fn execute(
        verb: &str,
        arguments: Option<Value>,
        session: &Arc<Mutex<ZptSessionManager>>,
    ) -> CommandResult {
        let args = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(v) => v,
        };

        if !Self::is_supported(verb) {
            return CommandResult::failed(verb, args, &McpError::ToolNotFound(verb.to_string()));
        }
        if !args.is_object() {
            let err = McpError::InvalidParams("arguments must be a JSON object".to_string());
            return CommandResult::failed(verb, args, &err);
        }

        let mut session = session.lock().await;
        session.record_verb();
        tracing::debug!(session = %session.session_id(), "Executing verb {verb}");

        match Self::dispatch(verb, args.clone(), &mut session).await {
            Ok(result) => CommandResult::ok(verb, result),
            Err(e) => {
                tracing::debug!("Verb {verb} failed: {e}");
                CommandResult::failed(verb, args, &e)
            }
        }
    }

    async fn dispatch(verb: &str, args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
        match verb {
            "tell" => tell::execute(args, session).await,
            "ask" => ask::execute(args, session).await,
            "augment" => augment::execute(args, session).await,
            "zoom" => zoom::execute(args, session).await,
            "pan" => pan::execute(args, session).await,
            "tilt" => tilt::execute(args, session).await,
            "inspect" => inspect::execute(args, session).await,
            "remember" => remember::execute(args, session).await,
            "forget" => forget::execute(args, session).await,
            "recall" => recall::execute(args, session).await,
            "project_context" => project_context::execute(args, session).await,
            "fade_memory" => fade_memory::execute(args, session).await,
            DERIVE_TOPIC => derive_topic::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(verb.to_string())),
        }
    }
}

//! Verb dispatch: one module per verb, one registry in front of them.

pub mod ask;
pub mod augment;
pub mod derive_topic;
pub mod fade_memory;
pub mod forget;
pub mod inspect;
pub mod pan;
pub mod project_context;
pub mod recall;
pub mod registry;
pub mod remember;
pub mod tell;
pub mod tilt;
pub mod zoom;

use serde::de::DeserializeOwned;
use serde_json::Value;

use agentic_zpt::ZptError;

use crate::session::ZptSessionManager;
use crate::types::{McpError, McpResult};

pub use registry::{CommandResult, VerbRegistry, DERIVE_TOPIC, SUPPORTED_VERBS};

/// Deserialize verb arguments. A missing required field names the field.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| {
        let message = e.to_string();
        match missing_field(&message) {
            Some(field) => McpError::Zpt(ZptError::MissingParameter(field)),
            None => McpError::InvalidParams(message),
        }
    })
}

fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(field, _)| field.to_string())
}

/// A required text argument that must not be blank.
pub(crate) fn require_text(name: &str, value: &str) -> McpResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ZptError::MissingParameter(name.to_string()).into());
    }
    Ok(trimmed.to_string())
}

/// A factor in `(0, 1]`.
pub(crate) fn check_factor(name: &str, value: f32) -> McpResult<f32> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ZptError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be in (0, 1], got {value}"),
        }
        .into());
    }
    Ok(value)
}

/// Attach a navigation pass to a state-change result when a query was given.
pub(crate) async fn with_navigation(
    mut result: Value,
    query: Option<&str>,
    session: &ZptSessionManager,
) -> McpResult<Value> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(result);
    };
    let outcome = session.navigate(Some(query)).await?;
    if let Some(obj) = result.as_object_mut() {
        obj.insert("navigation".to_string(), serde_json::to_value(outcome)?);
    }
    Ok(result)
}

/// The current ZPT state as returned by the navigation verbs.
pub(crate) fn zpt_summary(session: &ZptSessionManager) -> Value {
    let zpt = &session.state().zpt;
    serde_json::json!({
        "zoom": zpt.zoom,
        "pan": zpt.pan,
        "tilt": zpt.tilt,
        "transform": zpt.transform,
        "filterCount": zpt.pan.filter_count(),
    })
}

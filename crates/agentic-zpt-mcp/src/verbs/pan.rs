//! The `pan` verb: set topical, entity, temporal, and geographic filters.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{GeographicFilter, PanUpdate, TemporalRange, ZptError};

use super::{parse_args, with_navigation, zpt_summary};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct PanParams {
    #[serde(default)]
    domains: Option<Value>,
    #[serde(default)]
    keywords: Option<Value>,
    #[serde(default)]
    entities: Option<Value>,
    #[serde(default)]
    temporal: Option<Value>,
    #[serde(default)]
    geographic: Option<Value>,
    #[serde(default)]
    query: Option<String>,
}

pub fn definition() -> ToolDefinition {
    let list = json!({
        "oneOf": [
            { "type": "array", "items": { "type": "string" } },
            { "type": "string" }
        ]
    });
    ToolDefinition {
        name: "pan".to_string(),
        description: Some(
            "Replace the supplied filter slots; absent slots are kept, empty values clear"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "domains": list,
                "keywords": list,
                "entities": list,
                "temporal": {
                    "type": "object",
                    "properties": {
                        "start": { "type": "string", "format": "date-time" },
                        "end": { "type": "string", "format": "date-time" }
                    }
                },
                "geographic": {
                    "type": "object",
                    "description": "{bbox:[minLon,minLat,maxLon,maxLat]} or {center:{lat,lon}, radius}"
                },
                "query": { "type": "string" }
            }
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: PanParams = parse_args(args)?;

    let update = PanUpdate {
        domains: params.domains.map(|v| string_list("domains", v)).transpose()?,
        keywords: params.keywords.map(|v| string_list("keywords", v)).transpose()?,
        entities: params.entities.map(|v| string_list("entities", v)).transpose()?,
        temporal: params.temporal.map(temporal).transpose()?,
        geographic: params.geographic.map(geographic).transpose()?,
    };

    let has_query = params.query.as_deref().is_some_and(|q| !q.trim().is_empty());
    if update.is_empty() && !has_query {
        return Err(ZptError::InvalidPan(
            "pan needs at least one of domains, keywords, entities, temporal, geographic".to_string(),
        )
        .into());
    }

    let filters = session.state_mut().apply_pan(update)?.clone();

    let result = json!({
        "pan": filters,
        "filterCount": filters.filter_count(),
        "zpt": zpt_summary(session),
    });
    with_navigation(result, params.query.as_deref(), session).await
}

/// A string or list of strings. An empty string or array clears the slot.
fn string_list(slot: &str, value: Value) -> Result<Vec<String>, ZptError> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(ZptError::InvalidPan(format!(
                    "{slot} must contain strings, found {other}"
                ))),
            })
            .collect(),
        other => Err(ZptError::InvalidPan(format!(
            "{slot} must be a string or a list of strings, found {other}"
        ))),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn temporal(value: Value) -> Result<Option<TemporalRange>, ZptError> {
    if is_blank(&value) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ZptError::InvalidPan(format!("temporal must be {{start, end}}: {e}")))
}

fn geographic(value: Value) -> Result<Option<GeographicFilter>, ZptError> {
    if is_blank(&value) {
        return Ok(None);
    }
    serde_json::from_value(value).map(Some).map_err(|_| {
        ZptError::InvalidPan(
            "geographic must be {bbox:[minLon,minLat,maxLon,maxLat]} or {center:{lat,lon}, radius}"
                .to_string(),
        )
    })
}

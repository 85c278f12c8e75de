//! The `zoom` verb: set the abstraction level.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::ZoomLevel;

use super::{parse_args, with_navigation, zpt_summary};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct ZoomParams {
    level: String,
    #[serde(default)]
    query: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "zoom".to_string(),
        description: Some(
            "Set the abstraction level; with a query, navigate at the new level".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "level": { "type": "string", "enum": ZoomLevel::names() },
                "query": { "type": "string" }
            },
            "required": ["level"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: ZoomParams = parse_args(args)?;
    let level = ZoomLevel::parse(params.level.trim())?;

    let previous = session.state_mut().set_zoom(level);

    let result = json!({
        "zoom": level,
        "previous": previous,
        "zpt": zpt_summary(session),
    });
    with_navigation(result, params.query.as_deref(), session).await
}

//! The `tilt` verb: set the representation style.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::TiltStyle;

use super::{parse_args, with_navigation, zpt_summary};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct TiltParams {
    style: String,
    #[serde(default)]
    query: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "tilt".to_string(),
        description: Some("Set the representation style of navigation results".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "style": { "type": "string", "enum": TiltStyle::names() },
                "query": { "type": "string" }
            },
            "required": ["style"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: TiltParams = parse_args(args)?;
    let style = TiltStyle::parse(params.style.trim())?;

    let previous = session.state_mut().set_tilt(style);

    let result = json!({
        "tilt": style,
        "previous": previous,
        "zpt": zpt_summary(session),
    });
    with_navigation(result, params.query.as_deref(), session).await
}

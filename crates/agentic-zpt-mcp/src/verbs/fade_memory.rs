//! The `fade_memory` verb: lower the relevance of memories over time.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{MemoryDomain, MemoryItem, ZptError};

use super::{check_factor, parse_args};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FadeParams {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default = "default_fade_factor")]
    fade_factor: f32,
    #[serde(default = "default_transition")]
    transition: String,
    #[serde(default = "default_true")]
    preserve_instructions: bool,
}

fn default_fade_factor() -> f32 {
    0.1
}

fn default_transition() -> String {
    "smooth".to_string()
}

fn default_true() -> bool {
    true
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "fade_memory".to_string(),
        description: Some(
            "Fade memory relevance; 'hard' removes matching memories outright".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "domain": { "type": "string", "enum": ["user", "project", "session", "instruction"] },
                "fadeFactor": { "type": "number", "exclusiveMinimum": 0, "maximum": 1, "default": 0.1 },
                "transition": { "type": "string", "enum": ["smooth", "fade", "hard"], "default": "smooth" },
                "preserveInstructions": { "type": "boolean", "default": true }
            }
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: FadeParams = parse_args(args)?;
    let factor = check_factor("fadeFactor", params.fade_factor)?;
    let domain = params
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(MemoryDomain::parse)
        .transpose()?;
    let preserve = params.preserve_instructions;

    let selects = |item: &MemoryItem| {
        if preserve && item.domain == MemoryDomain::Instruction {
            return false;
        }
        domain.map_or(true, |d| item.domain == d)
    };

    let store = session.store_mut();
    let transition = params.transition.trim();
    let (affected, applied) = match transition {
        "smooth" => (store.fade_where(factor, selects), factor),
        "fade" => {
            let doubled = (factor * 2.0).min(1.0);
            (store.fade_where(doubled, selects), doubled)
        }
        "hard" => (store.remove_where(selects), 1.0),
        other => {
            return Err(ZptError::InvalidParameter {
                name: "transition".to_string(),
                reason: format!("unsupported transition '{other}', expected smooth, fade or hard"),
            }
            .into())
        }
    };

    Ok(json!({
        "domain": domain,
        "transition": transition,
        "fadeFactor": applied,
        "preserveInstructions": preserve,
        "affected": affected,
        "remaining": session.store().count(),
    }))
}

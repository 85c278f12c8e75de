//! The `forget` verb: fade or remove memories by id, domain, or tag.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{MemoryDomain, MemoryItem, ZptError};

use super::{check_factor, parse_args};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForgetParams {
    target: Value,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default = "default_fade_factor")]
    fade_factor: f32,
}

fn default_method() -> String {
    "fade".to_string()
}

fn default_fade_factor() -> f32 {
    0.1
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Item(u64),
    Domain(MemoryDomain),
    Tag(String),
}

impl Target {
    fn parse(value: &Value) -> Result<Self, ZptError> {
        let invalid = |reason: &str| ZptError::InvalidParameter {
            name: "target".to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::Number(n) => n
                .as_u64()
                .map(Target::Item)
                .ok_or_else(|| invalid("item id must be a positive integer")),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(id) = s.parse::<u64>() {
                    Ok(Target::Item(id))
                } else if let Some(domain) = s.strip_prefix("domain:") {
                    Ok(Target::Domain(MemoryDomain::parse(domain.trim())?))
                } else if let Some(tag) = s.strip_prefix("tag:").map(str::trim) {
                    if tag.is_empty() {
                        return Err(invalid("tag must not be empty"));
                    }
                    Ok(Target::Tag(tag.to_string()))
                } else {
                    Err(invalid("expected an item id, 'domain:<name>' or 'tag:<name>'"))
                }
            }
            _ => Err(invalid("expected an item id, 'domain:<name>' or 'tag:<name>'")),
        }
    }

    fn matches(&self, item: &MemoryItem) -> bool {
        match self {
            Target::Item(id) => item.id == *id,
            Target::Domain(d) => item.domain == *d,
            Target::Tag(t) => item.tags.iter().any(|tag| tag.eq_ignore_ascii_case(t)),
        }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "forget".to_string(),
        description: Some("Fade or remove memories by id, domain:<name>, or tag:<name>".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "target": { "oneOf": [{ "type": "string" }, { "type": "integer" }] },
                "method": { "type": "string", "enum": ["fade", "remove"], "default": "fade" },
                "fadeFactor": { "type": "number", "exclusiveMinimum": 0, "maximum": 1, "default": 0.1 }
            },
            "required": ["target"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: ForgetParams = parse_args(args)?;
    let target = Target::parse(&params.target)?;
    let method = params.method.trim();

    let store = session.store_mut();
    let affected = match method {
        "fade" => {
            let factor = check_factor("fadeFactor", params.fade_factor)?;
            store.fade_where(factor, |i| target.matches(i))
        }
        "remove" => match target {
            Target::Item(id) => store.remove(id).map(|_| 1)?,
            _ => store.remove_where(|i| target.matches(i)),
        },
        other => {
            return Err(ZptError::InvalidParameter {
                name: "method".to_string(),
                reason: format!("unsupported method '{other}', expected fade or remove"),
            }
            .into())
        }
    };

    if let (Target::Item(id), 0) = (&target, affected) {
        return Err(ZptError::ItemNotFound(*id).into());
    }

    Ok(json!({
        "target": params.target,
        "method": method,
        "affected": affected,
        "remaining": session.store().count(),
    }))
}

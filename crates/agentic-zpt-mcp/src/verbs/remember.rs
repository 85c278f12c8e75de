//! The `remember` verb: store a memory in a domain.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{ItemKind, MemoryDomain, MemoryItem, ZptError};

use super::{parse_args, require_text};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RememberParams {
    content: String,
    #[serde(default = "default_domain")]
    domain: String,
    #[serde(default)]
    domain_id: Option<String>,
    #[serde(default = "default_importance")]
    importance: f32,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_domain() -> String {
    "user".to_string()
}

fn default_importance() -> f32 {
    0.5
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "remember".to_string(),
        description: Some("Store a memory with domain, importance, and tags".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "content": { "type": "string" },
                "domain": {
                    "type": "string",
                    "enum": ["user", "project", "session", "instruction"],
                    "default": "user"
                },
                "domainId": { "type": "string" },
                "importance": { "type": "number", "minimum": 0, "maximum": 1, "default": 0.5 },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["content"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: RememberParams = parse_args(args)?;
    let content = require_text("content", &params.content)?;
    let domain = MemoryDomain::parse(params.domain.trim())?;

    if !(0.0..=1.0).contains(&params.importance) {
        return Err(ZptError::InvalidParameter {
            name: "importance".to_string(),
            reason: format!("must be between 0 and 1, got {}", params.importance),
        }
        .into());
    }

    let domain_id = params
        .domain_id
        .filter(|d| !d.trim().is_empty())
        .or_else(|| match domain {
            MemoryDomain::Project => session.state().active_project.clone(),
            _ => None,
        });

    let embedding = session.embed(&content).await?;
    let concepts = session.extract_concepts(&content).await?;

    let mut item = MemoryItem::new(content, ItemKind::Memory, domain);
    item.domain_id = domain_id.clone();
    item.importance = params.importance;
    item.tags = params.tags.clone();
    item.concepts = concepts.clone();
    item.embedding = embedding;

    let id = session.store_mut().add(item);
    session.state_mut().touch_cache(concepts.len(), 1);

    Ok(json!({
        "remembered": true,
        "id": id,
        "domain": domain,
        "domainId": domain_id,
        "importance": params.importance,
        "tags": params.tags,
        "concepts": concepts,
    }))
}

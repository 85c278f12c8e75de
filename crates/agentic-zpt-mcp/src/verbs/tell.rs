//! The `tell` verb: add content to the session corpus.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{Interaction, ItemKind, MemoryDomain, MemoryItem};

use super::{parse_args, require_text};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct TellParams {
    content: String,
    #[serde(default = "default_kind", rename = "type")]
    kind: String,
    #[serde(default)]
    metadata: Value,
}

fn default_kind() -> String {
    "interaction".to_string()
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "tell".to_string(),
        description: Some("Store content in the session corpus".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "content": { "type": "string" },
                "type": {
                    "type": "string",
                    "enum": ["interaction", "document", "concept"],
                    "default": "interaction"
                },
                "metadata": { "type": "object" }
            },
            "required": ["content"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: TellParams = parse_args(args)?;
    let content = require_text("content", &params.content)?;
    let kind = ItemKind::parse(params.kind.trim())?;

    let embedding = session.embed(&content).await?;
    let concepts = session.extract_concepts(&content).await?;

    let (state, store) = session.parts_mut();

    let mut item = MemoryItem::new(content.clone(), kind, MemoryDomain::Session);
    if let Some(project) = state.active_project.clone() {
        item.domain = MemoryDomain::Project;
        item.domain_id = Some(project);
    }
    item.concepts = concepts.clone();
    item.embedding = embedding;
    item.metadata = params.metadata.clone();
    if let Some(tags) = params.metadata.get("tags").and_then(Value::as_array) {
        item.tags = tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    let size = content.len();
    let id = store.add(item);

    if kind == ItemKind::Interaction {
        let response = params
            .metadata
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string);
        state.record_interaction(
            Interaction {
                prompt: content,
                response,
                concepts: concepts.clone(),
                timestamp: Utc::now(),
            },
            size,
        );
    } else {
        state.touch_cache(concepts.len(), 1);
        state.cache.size_bytes += size as u64;
    }

    Ok(json!({
        "stored": true,
        "id": id,
        "type": kind,
        "concepts": concepts,
        "sessionCache": state.cache,
    }))
}

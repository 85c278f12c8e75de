//! The `recall` verb: semantic search over stored memories.

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::MemoryDomain;

use super::{parse_args, require_text};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct RecallParams {
    query: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    threshold: f32,
}

fn default_limit() -> usize {
    10
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "recall".to_string(),
        description: Some("Recall memories similar to a query under the current pan".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "domain": { "type": "string", "enum": ["user", "project", "session", "instruction"] },
                "limit": { "type": "integer", "default": 10 },
                "threshold": { "type": "number", "default": 0.0 }
            },
            "required": ["query"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: RecallParams = parse_args(args)?;
    let query = require_text("query", &params.query)?;
    let domain = params
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(MemoryDomain::parse)
        .transpose()?;

    let embedding = session.embed(&query).await?;
    let store = session.store();
    let hits = store.search(
        &embedding,
        &session.state().zpt.pan,
        store.count(),
        params.threshold,
    );

    let memories: Vec<Value> = hits
        .iter()
        .filter_map(|m| store.get(m.id).map(|item| (m.similarity, item)))
        .filter(|(_, item)| domain.map_or(true, |d| item.domain == d))
        .take(params.limit.max(1))
        .map(|(similarity, item)| {
            json!({
                "id": item.id,
                "content": item.content,
                "domain": item.domain,
                "domainId": item.domain_id,
                "tags": item.tags,
                "similarity": similarity,
                "relevance": item.relevance,
                "createdAt": item.created_at,
            })
        })
        .collect();

    Ok(json!({
        "query": query,
        "domain": domain,
        "count": memories.len(),
        "memories": memories,
    }))
}

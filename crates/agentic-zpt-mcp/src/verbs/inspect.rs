//! The `inspect` verb: report session, ZPT, memory, or history state.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use agentic_zpt::{MemoryDomain, ZptError};

use super::{parse_args, zpt_summary};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

const SUMMARY_ROWS: usize = 10;

#[derive(Debug, Deserialize)]
struct InspectParams {
    #[serde(default = "default_what")]
    what: String,
    #[serde(default)]
    details: bool,
}

fn default_what() -> String {
    "session".to_string()
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "inspect".to_string(),
        description: Some("Inspect session, navigation, memory, or history state".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "what": {
                    "type": "string",
                    "enum": ["session", "zpt", "memory", "history", "all"],
                    "default": "session"
                },
                "details": { "type": "boolean", "default": false }
            }
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: InspectParams = parse_args(args)?;
    let details = params.details;

    let mut out = Map::new();
    let what = params.what.trim();
    match what {
        "session" => {
            out.insert("session".to_string(), session_view(session));
        }
        "zpt" => {
            out.insert("zpt".to_string(), zpt_summary(session));
        }
        "memory" => {
            out.insert("memory".to_string(), memory_view(session, details));
        }
        "history" => {
            out.insert("history".to_string(), history_view(session, details));
        }
        "all" => {
            out.insert("session".to_string(), session_view(session));
            out.insert("zpt".to_string(), zpt_summary(session));
            out.insert("memory".to_string(), memory_view(session, details));
            out.insert("history".to_string(), history_view(session, details));
        }
        other => {
            return Err(ZptError::InvalidParameter {
                name: "what".to_string(),
                reason: format!(
                    "unsupported target '{other}', expected session, zpt, memory, history or all"
                ),
            }
            .into())
        }
    }
    out.insert("inspected".to_string(), json!(what));
    Ok(Value::Object(out))
}

fn session_view(session: &ZptSessionManager) -> Value {
    let state = session.state();
    json!({
        "sessionId": state.session_id,
        "createdAt": state.created_at,
        "cache": state.cache,
        "verbCount": session.verb_count(),
        "uptimeSecs": session.uptime_secs(),
        "activeProject": state.active_project,
        "recentInteractions": state.recent_interactions.len(),
    })
}

fn memory_view(session: &ZptSessionManager, details: bool) -> Value {
    let store = session.store();
    let by_domain: Map<String, Value> = MemoryDomain::ALL
        .iter()
        .map(|d| (d.as_str().to_string(), json!(store.by_domain(*d).len())))
        .collect();

    let mut view = json!({
        "items": store.count(),
        "sizeBytes": store.size_bytes(),
        "byDomain": by_domain,
        "updatedAt": store.updated_at,
    });

    if details {
        let recent: Vec<Value> = store
            .recent(SUMMARY_ROWS)
            .into_iter()
            .map(|i| {
                json!({
                    "id": i.id,
                    "type": i.kind,
                    "domain": i.domain,
                    "relevance": i.relevance,
                    "importance": i.importance,
                    "tags": i.tags,
                    "createdAt": i.created_at,
                })
            })
            .collect();
        view["recent"] = json!(recent);
    }
    view
}

fn history_view(session: &ZptSessionManager, details: bool) -> Value {
    let history = &session.state().history;
    let limit = if details { history.len() } else { SUMMARY_ROWS };
    json!({
        "count": history.len(),
        "capacity": session.state().history_size(),
        "entries": history.iter().take(limit).collect::<Vec<_>>(),
    })
}

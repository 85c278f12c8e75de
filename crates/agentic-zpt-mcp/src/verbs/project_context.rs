//! The `project_context` verb: create, switch, list, or archive projects.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{ProjectContext, ProjectStatus, ZptError};

use super::parse_args;
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default = "default_action")]
    action: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn default_action() -> String {
    "switch".to_string()
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "project_context".to_string(),
        description: Some("Manage the active project context".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "projectId": { "type": "string" },
                "action": {
                    "type": "string",
                    "enum": ["switch", "create", "list", "archive"],
                    "default": "switch"
                },
                "name": { "type": "string" },
                "description": { "type": "string" }
            }
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: ProjectParams = parse_args(args)?;
    let project_id = params
        .project_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    let state = session.state_mut();

    match params.action.trim() {
        "list" => {}
        "create" => {
            let name = params
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            let id = project_id
                .or_else(|| name.as_deref().map(slug))
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ZptError::MissingParameter("projectId".to_string()))?;

            if state.project(&id).is_some() {
                return Err(ZptError::InvalidParameter {
                    name: "projectId".to_string(),
                    reason: format!("project '{id}' already exists"),
                }
                .into());
            }
            state.projects.push(ProjectContext {
                id: id.clone(),
                name: name.unwrap_or_else(|| id.clone()),
                description: params.description.clone(),
                status: ProjectStatus::Active,
                created_at: Utc::now(),
            });
            state.active_project = Some(id);
        }
        "switch" => {
            let id = project_id.ok_or_else(|| ZptError::MissingParameter("projectId".to_string()))?;
            let project = state
                .project_mut(&id)
                .ok_or_else(|| ZptError::ProjectNotFound(id.clone()))?;
            project.status = ProjectStatus::Active;
            state.active_project = Some(id);
        }
        "archive" => {
            let id = project_id.ok_or_else(|| ZptError::MissingParameter("projectId".to_string()))?;
            let project = state
                .project_mut(&id)
                .ok_or_else(|| ZptError::ProjectNotFound(id.clone()))?;
            project.status = ProjectStatus::Archived;
            if state.active_project.as_deref() == Some(id.as_str()) {
                state.active_project = None;
            }
        }
        other => {
            return Err(ZptError::InvalidParameter {
                name: "action".to_string(),
                reason: format!(
                    "unsupported action '{other}', expected switch, create, list or archive"
                ),
            }
            .into())
        }
    }

    let active = state
        .active_project
        .as_deref()
        .and_then(|id| state.project(id));
    Ok(json!({
        "action": params.action.trim(),
        "activeProject": active,
        "projects": state.projects,
    }))
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

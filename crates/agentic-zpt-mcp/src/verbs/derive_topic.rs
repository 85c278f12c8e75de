//! The `derive_topic` verb: label recent interactions and pan to the result.

use std::time::Duration;

use serde_json::{json, Value};

use agentic_zpt::topic::{build_context_window, keyword_hints, render_template};
use agentic_zpt::{parse_topic_reply, GenerationOptions, PanUpdate, ZptError};

use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

const KEYWORD_HINTS: usize = 10;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "derive_topic".to_string(),
        description: Some(
            "Derive a topic label from recent interactions and pan to it".to_string(),
        ),
        input_schema: json!({ "type": "object", "properties": {} }),
    }
}

pub async fn execute(_args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let topic = session.services().topic.clone();
    let recent_count = topic
        .recent_count
        .filter(|n| *n > 0)
        .ok_or_else(|| ZptError::ConfigurationMissing("topic.recent_count".to_string()))?;
    let max_chars = topic
        .max_chars_per_item
        .filter(|n| *n > 0)
        .ok_or_else(|| ZptError::ConfigurationMissing("topic.max_chars_per_item".to_string()))?;
    let template = topic
        .prompt_template
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ZptError::ConfigurationMissing("topic.prompt_template".to_string()))?;

    let interactions = session.state().last_interactions(recent_count);
    if interactions.is_empty() {
        return Err(ZptError::NoRecentInteractions.into());
    }
    let used = interactions.len();
    let context = build_context_window(&interactions, max_chars);
    let keywords = keyword_hints(&context, KEYWORD_HINTS);

    let limit = Duration::from_secs(topic.timeout_secs);
    let services = session.services();

    let concepts = tokio::time::timeout(limit, services.extractor.extract_concepts(&context))
        .await
        .map_err(|_| ZptError::Timeout(format!("concept extraction exceeded {limit:?}")))??;

    let prompt = render_template(
        &template,
        &[
            ("context", context.as_str()),
            ("keywords", keywords.join(", ").as_str()),
            ("concepts", concepts.join(", ").as_str()),
        ],
    );

    let options = GenerationOptions {
        max_tokens: topic.max_tokens,
        temperature: topic.temperature,
    };
    let reply = tokio::time::timeout(limit, services.generator.generate(&prompt, &options))
        .await
        .map_err(|_| ZptError::Timeout(format!("topic generation exceeded {limit:?}")))??;

    let label = parse_topic_reply(&reply)?;
    tracing::debug!(label = %label.label, "Derived topic");

    let filters = session
        .state_mut()
        .apply_pan(PanUpdate {
            domains: Some(vec![label.label.clone()]),
            keywords: Some(label.keywords.clone()),
            ..Default::default()
        })?
        .clone();

    Ok(json!({
        "topic": label,
        "pan": filters,
        "filterCount": filters.filter_count(),
        "interactionsUsed": used,
    }))
}

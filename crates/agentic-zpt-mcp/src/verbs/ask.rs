//! The `ask` verb: answer a question from the session corpus.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::{GenerationOptions, Interaction, ZptError};

use super::{parse_args, require_text};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

const CONTEXT_ITEM_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct AskParams {
    question: String,
    #[serde(default)]
    options: AskOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskOptions {
    #[serde(default = "default_true")]
    use_context: bool,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    threshold: f32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            use_context: true,
            limit: default_limit(),
            threshold: 0.0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    5
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "ask".to_string(),
        description: Some(
            "Answer a question using corpus context under the current pan filters".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "options": {
                    "type": "object",
                    "properties": {
                        "useContext": { "type": "boolean", "default": true },
                        "limit": { "type": "integer", "default": 5 },
                        "threshold": { "type": "number", "default": 0.0 }
                    }
                }
            },
            "required": ["question"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: AskParams = parse_args(args)?;
    let question = require_text("question", &params.question)?;
    let options = params.options;

    let embedding = session.embed(&question).await?;
    let matches = if options.use_context {
        session.store().search(
            &embedding,
            &session.state().zpt.pan,
            options.limit.max(1),
            options.threshold,
        )
    } else {
        Vec::new()
    };

    let context: Vec<(u64, f32, String)> = matches
        .iter()
        .filter_map(|m| {
            session
                .store()
                .get(m.id)
                .map(|item| (m.id, m.similarity, truncate(&item.content)))
        })
        .collect();

    let prompt = build_prompt(&question, &context);
    let generation = GenerationOptions {
        max_tokens: session.state().zpt.transform.max_tokens.min(1024),
        ..Default::default()
    };

    let (answer, generated) = match session.services().generator.generate(&prompt, &generation).await {
        Ok(answer) => (answer, true),
        Err(ZptError::ServiceUnavailable(reason)) => {
            tracing::debug!("No generator available, answering from context: {reason}");
            let fallback = context
                .first()
                .map(|(_, _, text)| text.clone())
                .unwrap_or_else(|| "No relevant context found.".to_string());
            (fallback, false)
        }
        Err(e) => return Err(e.into()),
    };

    let concepts = session.extract_concepts(&question).await?;
    let size = question.len() + answer.len();
    session.state_mut().record_interaction(
        Interaction {
            prompt: question.clone(),
            response: Some(answer.clone()),
            concepts,
            timestamp: Utc::now(),
        },
        size,
    );

    let context_json: Vec<Value> = context
        .iter()
        .map(|(id, similarity, text)| json!({ "id": id, "similarity": similarity, "content": text }))
        .collect();

    Ok(json!({
        "question": question,
        "answer": answer,
        "generated": generated,
        "contextCount": context_json.len(),
        "context": context_json,
    }))
}

fn build_prompt(question: &str, context: &[(u64, f32, String)]) -> String {
    if context.is_empty() {
        return format!("Answer the question.\n\nQuestion: {question}");
    }
    let blocks = context
        .iter()
        .enumerate()
        .map(|(i, (_, _, text))| format!("[{}] {text}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Answer the question using the context.\n\nContext:\n{blocks}\n\nQuestion: {question}")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= CONTEXT_ITEM_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(CONTEXT_ITEM_CHARS).collect();
    out.push('…');
    out
}

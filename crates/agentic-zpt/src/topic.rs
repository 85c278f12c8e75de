//! Building blocks for deriving a topic label from recent interactions.
//!
//! The orchestration (fetching interactions, calling the generator, applying
//! the resulting pan) lives with the verb dispatcher; everything here is pure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keywords::extract_keywords;
use crate::session::Interaction;
use crate::types::{ZptError, ZptResult};

pub const DEFAULT_TOPIC_TEMPLATE: &str = "You label conversations for a knowledge navigator.\n\
Recent interactions:\n{{context}}\n\n\
Keyword hints: {{keywords}}\n\
Concept hints: {{concepts}}\n\n\
Reply with strict JSON only: {\"label\": \"<short topic label>\", \"keywords\": [\"<keyword>\", ...]}";

/// A derived topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicLabel {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Concatenate interactions into one context block, truncating each item.
pub fn build_context_window(interactions: &[&Interaction], max_chars_per_item: usize) -> String {
    interactions
        .iter()
        .enumerate()
        .map(|(i, interaction)| {
            let mut block = format!(
                "[{}] User: {}",
                i + 1,
                truncate_chars(&interaction.prompt, max_chars_per_item)
            );
            if let Some(response) = interaction.response.as_deref().filter(|r| !r.is_empty()) {
                block.push_str("\nAssistant: ");
                block.push_str(&truncate_chars(response, max_chars_per_item));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Local keyword hints for the prompt.
pub fn keyword_hints(context: &str, limit: usize) -> Vec<String> {
    extract_keywords(context, limit)
}

/// Replace `{{name}}` placeholders. Unknown placeholders are left verbatim.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

/// Parse a generator reply into a topic. Accepts a fenced code block or a
/// bare JSON object, possibly surrounded by prose.
pub fn parse_topic_reply(reply: &str) -> ZptResult<TopicLabel> {
    let candidate = extract_json_block(reply).ok_or_else(|| {
        ZptError::InvalidGeneration("reply does not contain a JSON object".to_string())
    })?;

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| ZptError::InvalidGeneration(format!("reply is not valid JSON: {e}")))?;

    let label = value
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ZptError::InvalidGeneration("reply has no non-empty label".to_string()))?
        .to_string();

    let mut keywords: Vec<String> = Vec::new();
    if let Some(items) = value.get("keywords").and_then(Value::as_array) {
        for kw in items.iter().filter_map(Value::as_str).map(str::trim) {
            if !kw.is_empty() && !keywords.iter().any(|k| k == kw) {
                keywords.push(kw.to_string());
            }
        }
    }
    if keywords.is_empty() {
        return Err(ZptError::InvalidGeneration(
            "reply has no non-empty keyword list".to_string(),
        ));
    }

    Ok(TopicLabel { label, keywords })
}

fn extract_json_block(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```") {
        let after = &reply[start + 3..];
        // Skip an optional language tag on the fence line.
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let open = reply.find('{')?;
    let close = reply.rfind('}')?;
    (close > open).then(|| &reply[open..=close])
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn interaction(prompt: &str, response: Option<&str>) -> Interaction {
        Interaction {
            prompt: prompt.to_string(),
            response: response.map(str::to_string),
            concepts: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn context_window_truncates_each_item() {
        let a = interaction("abcdefghij", Some("short"));
        let b = interaction("xy", None);
        let ctx = build_context_window(&[&a, &b], 4);
        assert_eq!(ctx, "[1] User: abcd…\nAssistant: shor…\n\n[2] User: xy");
    }

    #[test]
    fn template_substitution() {
        let out = render_template("a {{x}} b {{y}} {{z}}", &[("x", "1"), ("y", "2")]);
        assert_eq!(out, "a 1 b 2 {{z}}");
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"label\": \"Rust memory\", \"keywords\": [\"rust\", \"borrow\"]}\n```";
        let topic = parse_topic_reply(reply).unwrap();
        assert_eq!(topic.label, "Rust memory");
        assert_eq!(topic.keywords, vec!["rust", "borrow"]);
    }

    #[test]
    fn parses_bare_object() {
        let topic = parse_topic_reply(r#"{"label":"Graphs","keywords":["rdf"," rdf ","sparql"]}"#)
            .unwrap();
        assert_eq!(topic.keywords, vec!["rdf", "sparql"]);
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_topic_reply("I think the topic is cooking").unwrap_err();
        assert_eq!(err.code(), "LLM_RESPONSE_INVALID");
    }

    #[test]
    fn rejects_empty_label_or_keywords() {
        assert!(parse_topic_reply(r#"{"label":"  ","keywords":["a"]}"#).is_err());
        assert!(parse_topic_reply(r#"{"label":"A","keywords":[]}"#).is_err());
        assert!(parse_topic_reply(r#"{"label":"A"}"#).is_err());
    }
}

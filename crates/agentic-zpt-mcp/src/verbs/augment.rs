//! The `augment` verb: enrich a stored item or free text with derived structure.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use agentic_zpt::keywords::{extract_keywords, sentences, tokenize};
use agentic_zpt::ZptError;

use super::{parse_args, require_text};
use crate::session::ZptSessionManager;
use crate::types::{McpResult, ToolDefinition};

const ATTRIBUTE_KEYWORDS: usize = 10;
const MAX_RELATIONSHIPS: usize = 20;

#[derive(Debug, Deserialize)]
struct AugmentParams {
    target: Value,
    #[serde(default = "default_operation")]
    operation: String,
}

fn default_operation() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Auto,
    Concepts,
    Attributes,
    Relationships,
}

impl Operation {
    fn parse(value: &str) -> Result<Self, ZptError> {
        match value {
            "auto" => Ok(Operation::Auto),
            "concepts" => Ok(Operation::Concepts),
            "attributes" => Ok(Operation::Attributes),
            "relationships" => Ok(Operation::Relationships),
            other => Err(ZptError::InvalidParameter {
                name: "operation".to_string(),
                reason: format!(
                    "unsupported operation '{other}', expected auto, concepts, attributes or relationships"
                ),
            }),
        }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "augment".to_string(),
        description: Some(
            "Extract concepts, attributes, or relationships for an item id or text".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "target": {
                    "oneOf": [{ "type": "string" }, { "type": "integer" }],
                    "description": "Memory item id or text to analyse"
                },
                "operation": {
                    "type": "string",
                    "enum": ["auto", "concepts", "attributes", "relationships"],
                    "default": "auto"
                }
            },
            "required": ["target"]
        }),
    }
}

pub async fn execute(args: Value, session: &mut ZptSessionManager) -> McpResult<Value> {
    let params: AugmentParams = parse_args(args)?;
    let operation = Operation::parse(params.operation.trim())?;

    let item_id = match &params.target {
        Value::Number(n) => Some(n.as_u64().ok_or_else(|| ZptError::InvalidParameter {
            name: "target".to_string(),
            reason: "item id must be a positive integer".to_string(),
        })?),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => {
            return Err(ZptError::InvalidParameter {
                name: "target".to_string(),
                reason: "must be an item id or text".to_string(),
            }
            .into())
        }
    };

    let text = match (item_id, &params.target) {
        (Some(id), _) => session
            .store()
            .get(id)
            .map(|i| i.content.clone())
            .ok_or(ZptError::ItemNotFound(id))?,
        (None, Value::String(s)) => require_text("target", s)?,
        (None, _) => return Err(ZptError::MissingParameter("target".to_string()).into()),
    };

    let mut result = json!({
        "target": params.target,
        "operation": params.operation.trim(),
    });

    let wants = |op: Operation| operation == op || operation == Operation::Auto;

    let mut concepts = Vec::new();
    if wants(Operation::Concepts) || wants(Operation::Relationships) {
        concepts = session.extract_concepts(&text).await?;
    }
    if wants(Operation::Concepts) {
        result["concepts"] = json!(concepts);
    }
    if wants(Operation::Attributes) {
        result["attributes"] = attributes(&text);
    }
    if wants(Operation::Relationships) {
        result["relationships"] = relationships(&concepts, session);
    }

    if let Some(id) = item_id {
        if wants(Operation::Concepts) {
            if let Some(item) = session.store_mut().items.iter_mut().find(|i| i.id == id) {
                for c in &concepts {
                    if !item.concepts.contains(c) {
                        item.concepts.push(c.clone());
                    }
                }
            }
        }
    }
    session.state_mut().touch_cache(concepts.len(), 0);

    Ok(result)
}

fn attributes(text: &str) -> Value {
    let mut terms = tokenize(text);
    terms.sort();
    terms.dedup();

    json!({
        "characters": text.chars().count(),
        "words": text.split_whitespace().count(),
        "sentences": sentences(text).len(),
        "distinctTerms": terms.len(),
        "keywords": extract_keywords(text, ATTRIBUTE_KEYWORDS),
    })
}

/// Concept pairs that co-occur in stored items, weighted by item count.
fn relationships(concepts: &[String], session: &ZptSessionManager) -> Value {
    let mut pairs: BTreeMap<(String, String), usize> = BTreeMap::new();

    for item in &session.store().items {
        let lower = item.content.to_lowercase();
        let present: Vec<&String> = concepts
            .iter()
            .filter(|c| {
                item.concepts.iter().any(|ic| ic.eq_ignore_ascii_case(c))
                    || lower.contains(&c.to_lowercase())
            })
            .collect();
        for (i, a) in present.iter().enumerate() {
            for b in &present[i + 1..] {
                let key = if a <= b {
                    ((*a).clone(), (*b).clone())
                } else {
                    ((*b).clone(), (*a).clone())
                };
                *pairs.entry(key).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<_> = pairs.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_RELATIONSHIPS)
        .map(|((source, target), weight)| json!({ "source": source, "target": target, "weight": weight }))
        .collect()
}

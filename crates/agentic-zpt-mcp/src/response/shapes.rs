//! Shape detection and the per-shape data builders.

use serde_json::{json, Map, Value};

use super::envelope::ResponseType;
use super::FormatError;

pub const PREVIEW_CHARS: usize = 200;
const FILTER_SAMPLE: usize = 3;

/// Pick the response type for a payload. First match wins and error
/// detection comes first.
pub fn detect(data: &Value) -> ResponseType {
    let Some(obj) = data.as_object() else {
        return ResponseType::Success;
    };

    if is_error(obj) {
        ResponseType::Error
    } else if is_navigation(obj) {
        ResponseType::Navigation
    } else if obj.get("preview").is_some_and(Value::is_object) {
        ResponseType::Preview
    } else if obj.get("options").is_some_and(Value::is_object) {
        ResponseType::Options
    } else if obj.get("schema").is_some_and(Value::is_object) {
        ResponseType::Schema
    } else if obj.get("status").is_some_and(Value::is_string)
        && (obj.contains_key("uptimeSecs") || obj.contains_key("checks"))
    {
        ResponseType::Health
    } else if obj.get("metrics").is_some_and(Value::is_object) {
        ResponseType::Metrics
    } else {
        ResponseType::Success
    }
}

fn is_error(obj: &Map<String, Value>) -> bool {
    if obj.get("success") == Some(&Value::Bool(false)) {
        return true;
    }
    obj.get("error")
        .and_then(Value::as_object)
        .is_some_and(|e| e.contains_key("code") || e.contains_key("message"))
}

fn is_outcome(obj: &Map<String, Value>) -> bool {
    obj.contains_key("zoom")
        && obj.contains_key("tilt")
        && (obj.contains_key("content") || obj.contains_key("corpuscles"))
}

fn is_navigation(obj: &Map<String, Value>) -> bool {
    is_outcome(obj)
        || obj
            .get("navigation")
            .and_then(Value::as_object)
            .is_some_and(is_outcome)
}

/// Normalize a pan filter set into `{applied, filters:{kind:{count, sample}}}`.
pub fn pan_summary(pan: &Value) -> Value {
    let mut filters = Map::new();
    let mut applied = false;

    for kind in ["domains", "keywords", "entities"] {
        let values: Vec<&Value> = pan
            .get(kind)
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default();
        applied |= !values.is_empty();
        filters.insert(
            kind.to_string(),
            json!({
                "count": values.len(),
                "sample": values.iter().take(FILTER_SAMPLE).collect::<Vec<_>>(),
            }),
        );
    }
    for kind in ["temporal", "geographic"] {
        if let Some(v) = pan.get(kind).filter(|v| !v.is_null()) {
            applied = true;
            filters.insert(kind.to_string(), v.clone());
        }
    }

    json!({ "applied": applied, "filters": filters })
}

pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

pub fn navigation(data: &Value) -> Result<Value, FormatError> {
    let obj = data
        .as_object()
        .ok_or_else(|| FormatError::malformed("navigation", "not an object"))?;

    // Either a bare outcome or a verb result wrapping one.
    let (outcome, extra) = match obj.get("navigation").and_then(Value::as_object) {
        Some(inner) if !is_outcome(obj) => (inner, Some(obj)),
        _ => (obj, None),
    };

    let content = match outcome.get("content") {
        Some(Value::Array(chunks)) => {
            let mut texts = Vec::with_capacity(chunks.len());
            for c in chunks {
                let text = c
                    .as_str()
                    .ok_or_else(|| FormatError::malformed("navigation", "content chunk is not text"))?;
                texts.push(text);
            }
            json!({
                "preview": truncate_preview(&texts.join("\n")),
                "chunks": chunks.len(),
            })
        }
        Some(Value::String(text)) => json!({ "preview": truncate_preview(text) }),
        Some(Value::Null) | None => json!({ "preview": "" }),
        Some(_) => return Err(FormatError::malformed("navigation", "content is not text")),
    };

    let corpuscles = outcome.get("corpuscles").cloned().unwrap_or(json!([]));
    let corpuscle_count = corpuscles.as_array().map(Vec::len).unwrap_or(0);

    let mut out = json!({
        "navigation": {
            "zoom": outcome.get("zoom"),
            "pan": pan_summary(outcome.get("pan").unwrap_or(&Value::Null)),
            "tilt": outcome.get("tilt"),
            "query": outcome.get("query"),
        },
        "content": content,
        "corpuscles": corpuscles,
        "stats": {
            "corpuscleCount": corpuscle_count,
            "matchedItems": outcome.get("matchedItems"),
            "totalItems": outcome.get("totalItems"),
            "tokenCount": outcome.get("tokenCount"),
            "truncated": outcome.get("truncated"),
        },
    });

    if let (Some(extra), Some(target)) = (extra, out.as_object_mut()) {
        for (k, v) in extra {
            if k != "navigation" {
                target.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
    }
    Ok(out)
}

pub fn preview(data: &Value) -> Result<Value, FormatError> {
    let p = data
        .get("preview")
        .and_then(Value::as_object)
        .ok_or_else(|| FormatError::malformed("preview", "missing preview object"))?;

    let sample: Vec<String> = match p.get("sample") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| truncate_preview(i.as_str().unwrap_or_default()))
            .collect(),
        _ => Vec::new(),
    };

    Ok(json!({
        "preview": {
            "zoom": p.get("zoom"),
            "pan": pan_summary(p.get("pan").unwrap_or(&Value::Null)),
            "tilt": p.get("tilt"),
            "estimatedItems": p.get("estimatedItems"),
            "estimatedCorpuscles": p.get("estimatedCorpuscles"),
            "estimatedTokens": p.get("estimatedTokens"),
            "withinBudget": p.get("withinBudget"),
            "sample": sample,
        }
    }))
}

pub fn options(data: &Value) -> Result<Value, FormatError> {
    let options = data
        .get("options")
        .and_then(Value::as_object)
        .ok_or_else(|| FormatError::malformed("options", "missing options object"))?;
    let counts: Map<String, Value> = options
        .iter()
        .filter_map(|(k, v)| v.as_array().map(|a| (k.clone(), json!(a.len()))))
        .collect();
    Ok(json!({ "options": options, "counts": counts }))
}

pub fn schema(data: &Value, version: &str) -> Result<Value, FormatError> {
    let schema = data
        .get("schema")
        .filter(|s| s.is_object())
        .ok_or_else(|| FormatError::malformed("schema", "missing schema object"))?;
    Ok(json!({ "schema": schema, "schemaVersion": version }))
}

pub fn health(data: &Value) -> Result<Value, FormatError> {
    let status = data
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| FormatError::malformed("health", "status is not text"))?;
    Ok(json!({
        "status": status,
        "healthy": status == "ok",
        "uptimeSecs": data.get("uptimeSecs"),
        "version": data.get("version"),
        "sessions": data.get("sessions"),
        "checks": data.get("checks").cloned().unwrap_or(json!({})),
    }))
}

pub fn metrics(data: &Value) -> Result<Value, FormatError> {
    let metrics = data
        .get("metrics")
        .filter(|m| m.is_object())
        .ok_or_else(|| FormatError::malformed("metrics", "missing metrics object"))?;
    Ok(json!({
        "metrics": metrics,
        "collectedAt": chrono::Utc::now().to_rfc3339(),
    }))
}

//! Optional envelope post-processing: discoverability links and compaction.

use serde_json::{json, Map, Value};

use super::envelope::ResponseType;

/// Drop null, empty-string and empty-object fields, recursively.
pub fn compress(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                let v = compress(v);
                let empty = match &v {
                    Value::Null => true,
                    Value::String(s) => s.is_empty(),
                    Value::Object(m) => m.is_empty(),
                    _ => false,
                };
                if !empty {
                    out.insert(k, v);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(compress).collect()),
        other => other,
    }
}

/// Links to related endpoints for the given response.
pub fn links(kind: ResponseType, self_path: Option<&str>, verb: Option<&str>) -> Value {
    let self_link = self_path
        .map(str::to_string)
        .or_else(|| verb.map(|v| format!("/api/verbs/{v}")));

    let mut links = json!({
        "options": "/api/zpt/options",
        "schema": "/api/zpt/schema",
        "health": "/health",
    });
    if let Some(s) = self_link {
        links["self"] = Value::String(s);
    }
    match kind {
        ResponseType::Navigation => {
            links["preview"] = json!("/api/zpt/preview");
            links["inspect"] = json!("/api/verbs/inspect");
        }
        ResponseType::Error => {
            links["documentation"] = json!("/api/zpt/schema");
        }
        ResponseType::Health => {
            links["metrics"] = json!("/metrics");
        }
        _ => {}
    }
    links
}

//! Strip sensitive fields from outbound payloads.

use serde_json::{Map, Value};

/// Nesting beyond this is replaced by [`DEPTH_SENTINEL`].
pub const MAX_DEPTH: usize = 32;
pub const DEPTH_SENTINEL: &str = "[Circular]";

/// Name segments that mark a field as sensitive wherever they appear.
const SENSITIVE_WORDS: &[&str] = &[
    "password",
    "passwords",
    "passwd",
    "passphrase",
    "secret",
    "secrets",
    "token",
    "tokens",
    "key",
    "keys",
    "apikey",
    "apikeys",
    "auth",
    "cookie",
    "cookies",
    "credential",
    "credentials",
    "pem",
];

/// Segment stems that are sensitive as prefixes (`authorization`, `secretvalue`).
const SENSITIVE_STEMS: &[&str] = &["password", "passwd", "secret", "authoriz", "authentic", "credential"];

/// Segments that turn a `token` field into a count, e.g. `maxTokens`.
const TOKEN_QUANTITIES: &[&str] = &[
    "max", "min", "count", "limit", "total", "num", "usage", "used", "budget", "estimated", "per",
];

/// Remove fields whose names denote secrets, recursively. Over-deep
/// subtrees collapse to a sentinel string.
pub fn sanitize_data(value: &Value) -> Value {
    sanitize_at(value, 0)
}

fn sanitize_at(value: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::String(DEPTH_SENTINEL.to_string());
    }
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                if !is_sensitive_key(k) {
                    out.insert(k.clone(), sanitize_at(v, depth + 1));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| sanitize_at(v, depth + 1)).collect()),
        other => other.clone(),
    }
}

/// `apiKeys`, `sessionTokenId`, `clientSecretValue`, `authorization_header`
/// are sensitive; `keywords`, `maxTokens`, `tokenCount`, `author` are not.
pub fn is_sensitive_key(key: &str) -> bool {
    let segments = segments(key);
    let quantity = segments
        .iter()
        .any(|s| TOKEN_QUANTITIES.contains(&s.as_str()));
    segments.iter().any(|segment| {
        let s = segment.as_str();
        if matches!(s, "token" | "tokens") {
            return !quantity;
        }
        SENSITIVE_WORDS.contains(&s) || SENSITIVE_STEMS.iter().any(|stem| s.starts_with(stem))
    })
}

/// Split camelCase, snake_case, kebab-case and dotted names into lower-case words.
fn segments(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in key.chars() {
        if matches!(ch, '_' | '-' | '.' | ' ') {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

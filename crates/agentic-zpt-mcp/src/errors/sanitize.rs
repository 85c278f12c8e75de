//! Redaction and truncation of messages before they leave the server.

use std::sync::OnceLock;

use regex::Regex;

const ELLIPSIS: char = '…';

fn secret_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(password|token|key)=("[^"]*"?|'[^']*'?|[^\s&;,…]+)"#)
            .expect("secret regex is valid")
    })
}

/// Redact `password=`, `token=` and `key=` values and cap the length at
/// `max_chars` characters. Applying it twice yields the same string.
pub fn sanitize_message(message: &str, max_chars: usize) -> String {
    let pattern = secret_pattern();
    let redacted = pattern.replace_all(message, "${1}=***").into_owned();
    if redacted.chars().count() <= max_chars {
        return redacted;
    }

    let keep = max_chars.saturating_sub(1);
    let mut cut = redacted
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(redacted.len());
    // Never split a redacted pair.
    if let Some(m) = pattern
        .find_iter(&redacted)
        .find(|m| m.start() < cut && cut < m.end())
    {
        cut = m.start();
    }

    let mut out = redacted[..cut].to_string();
    out.push(ELLIPSIS);
    out
}

//! Pure error classification.

use super::catalog;
use super::taxonomy::ErrorType;
use super::{ErrorContext, RaisedError};

/// Ordered message rules. First match wins.
const MESSAGE_RULES: &[(&[&str], ErrorType)] = &[
    (&["validation", "invalid"], ErrorType::Validation),
    (&["parameter"], ErrorType::Parameter),
    (&["timeout", "timed out"], ErrorType::Timeout),
    (&["corpus", "sparql"], ErrorType::Corpus),
    (&["processing", "transformation"], ErrorType::Processing),
    (&["memory", "resource"], ErrorType::Resource),
    (&["service", "unavailable"], ErrorType::ExternalService),
];

/// Classify a failure: catalog code, then status override, then message
/// rules, then UNKNOWN.
pub fn classify(error: &RaisedError, context: &ErrorContext) -> ErrorType {
    if let Some(entry) = error.code.as_deref().and_then(catalog::lookup) {
        return entry.error_type;
    }

    match context.status_override {
        Some(404) => return ErrorType::NotFound,
        Some(429) => return ErrorType::RateLimit,
        _ => {}
    }

    let message = error.message.to_lowercase();
    MESSAGE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| message.contains(n)))
        .map(|(_, t)| *t)
        .unwrap_or(ErrorType::Unknown)
}

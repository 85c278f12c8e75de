//! Independent structural validators run before any parsing.

use super::{HttpMethod, RawRequest, ValidationIssue};
use crate::config::RequestConfig;

type Validator = fn(&RawRequest, &RequestConfig) -> Vec<ValidationIssue>;

/// Validators in the order they run. Each sees the raw request only.
const VALIDATORS: &[Validator] = &[content_type, body_size, method, path, headers];

const ALLOWED_METHODS: [HttpMethod; 4] = [
    HttpMethod::Get,
    HttpMethod::Post,
    HttpMethod::Options,
    HttpMethod::Head,
];

const FORBIDDEN_PATH_SEQUENCES: [&str; 5] = ["../", "..%2f", "\\", "<script", "javascript:"];

const KNOWN_MEDIA_TYPES: [&str; 4] = [
    "application/json",
    "application/x-www-form-urlencoded",
    "multipart/form-data",
    "application/octet-stream",
];

/// Run every validator and collect all findings.
pub fn run_all(raw: &RawRequest, config: &RequestConfig) -> Vec<ValidationIssue> {
    VALIDATORS.iter().flat_map(|v| v(raw, config)).collect()
}

pub fn method(raw: &RawRequest, _config: &RequestConfig) -> Vec<ValidationIssue> {
    match HttpMethod::parse(&raw.method) {
        Some(m) if ALLOWED_METHODS.contains(&m) => Vec::new(),
        Some(m) => vec![ValidationIssue::critical(
            "method",
            format!("method {m} is not allowed"),
        )],
        None => vec![ValidationIssue::critical(
            "method",
            format!("unknown method '{}'", raw.method),
        )],
    }
}

pub fn path(raw: &RawRequest, config: &RequestConfig) -> Vec<ValidationIssue> {
    let path = raw.path();
    if path.is_empty() {
        return vec![ValidationIssue::critical("path", "path is empty")];
    }
    if path.chars().count() > config.max_path_length {
        return vec![ValidationIssue::critical(
            "path",
            format!("path exceeds {} characters", config.max_path_length),
        )];
    }

    let lower = path.to_lowercase();
    FORBIDDEN_PATH_SEQUENCES
        .iter()
        .filter(|seq| lower.contains(*seq))
        .map(|seq| {
            ValidationIssue::critical("path", format!("path contains forbidden sequence '{seq}'"))
        })
        .collect()
}

pub fn content_type(raw: &RawRequest, config: &RequestConfig) -> Vec<ValidationIssue> {
    let carries_body = HttpMethod::parse(&raw.method).is_some_and(|m| m.carries_body());
    if !carries_body || raw.body.is_none() {
        return Vec::new();
    }

    let Some(value) = raw.header("content-type") else {
        return vec![ValidationIssue::strict(
            "content_type",
            "content-type header is missing",
            config.strict,
        )];
    };

    let media = media_type(value);
    if media.starts_with("text/")
        || media.ends_with("+json")
        || KNOWN_MEDIA_TYPES.contains(&media.as_str())
    {
        Vec::new()
    } else {
        vec![ValidationIssue::strict(
            "content_type",
            format!("unsupported content type '{media}'"),
            config.strict,
        )]
    }
}

pub fn body_size(raw: &RawRequest, config: &RequestConfig) -> Vec<ValidationIssue> {
    let Some(declared) = raw.header("content-length") else {
        return Vec::new();
    };
    match declared.trim().parse::<usize>() {
        Ok(len) if len > config.max_body_size => vec![ValidationIssue::critical(
            "body_size",
            format!(
                "declared body of {len} bytes exceeds the {} byte limit",
                config.max_body_size
            ),
        )],
        Ok(_) => Vec::new(),
        Err(_) => vec![ValidationIssue::critical(
            "body_size",
            format!("content-length '{declared}' is not a number"),
        )],
    }
}

pub fn headers(raw: &RawRequest, config: &RequestConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if raw.headers.len() > config.max_headers {
        issues.push(ValidationIssue::critical(
            "headers",
            format!("more than {} headers", config.max_headers),
        ));
    }

    for (name, value) in &raw.headers {
        if name.is_empty() || has_control(name) || has_control(value) {
            issues.push(ValidationIssue::critical(
                "headers",
                format!("header '{}' contains control characters", name.trim()),
            ));
        }
    }

    for required in ["host", "user-agent"] {
        if raw.header(required).is_none() {
            issues.push(ValidationIssue::strict(
                "headers",
                format!("{required} header is missing"),
                config.strict,
            ));
        }
    }

    issues
}

fn has_control(s: &str) -> bool {
    s.contains(['\r', '\n', '\0'])
}

/// Lower-cased media type without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

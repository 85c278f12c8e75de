//! The request parser: validate, then normalize.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use indexmap::IndexMap;

use super::body::parse_body;
use super::validators;
use super::{
    accumulate, BodyStream, ClientInfo, HttpMethod, NormalizedRequest, ParamMap, ParseError,
    RawRequest, RequestBody, ValidationIssue,
};
use crate::config::RequestConfig;

pub struct RequestParser {
    config: RequestConfig,
    body_timeout: Duration,
}

impl RequestParser {
    pub fn new(config: RequestConfig) -> Self {
        let body_timeout = Duration::from_secs(config.body_timeout_secs);
        Self {
            config,
            body_timeout,
        }
    }

    /// Override the body read timeout.
    pub fn with_body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Validate and normalize a raw request. Any critical validator
    /// finding aborts before the body is touched.
    pub async fn parse(&self, raw: RawRequest) -> Result<NormalizedRequest, ParseError> {
        let (critical, warnings): (Vec<ValidationIssue>, Vec<ValidationIssue>) =
            validators::run_all(&raw, &self.config)
                .into_iter()
                .partition(ValidationIssue::is_critical);

        let declared = raw
            .header("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.config.max_body_size) {
            return Err(ParseError::BodyTooLarge {
                limit: self.config.max_body_size,
            });
        }
        if !critical.is_empty() {
            return Err(ParseError::Validation { issues: critical });
        }
        for w in &warnings {
            tracing::debug!(validator = %w.validator, "Request warning: {}", w.message);
        }

        let method = HttpMethod::parse(&raw.method).ok_or_else(|| ParseError::Validation {
            issues: vec![ValidationIssue::critical("method", "unknown method")],
        })?;

        let headers = normalize_headers(&raw.headers);
        let path = raw.path().to_string();
        let query = parse_query(raw.query_string());
        let client = client_info(&raw, &headers);

        let content_type = headers.get("content-type").cloned();
        let body = match raw.body {
            Some(stream) if method.carries_body() => {
                let bytes = read_body(stream, self.config.max_body_size, self.body_timeout).await?;
                parse_body(content_type.as_deref(), bytes).await?
            }
            _ => RequestBody::Absent,
        };

        let cookies = headers
            .get("cookie")
            .map(|c| parse_cookies(c.as_str()))
            .unwrap_or_default();

        Ok(NormalizedRequest {
            method,
            path,
            query,
            headers,
            body,
            cookies,
            client,
            warnings,
        })
    }
}

/// Read a body stream into memory. The running total is checked after
/// every chunk and the whole read is bounded by `timeout`; on either
/// failure the stream is dropped.
pub async fn read_body(
    mut stream: BodyStream,
    limit: usize,
    timeout: Duration,
) -> Result<Bytes, ParseError> {
    let read = async move {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if buf.len() + chunk.len() > limit {
                return Err(ParseError::BodyTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    };

    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| ParseError::BodyTimeout(timeout))?
}

/// Lower-case header names. Repeated headers are joined with `, `,
/// cookies with `; `.
fn normalize_headers(raw: &[(String, String)]) -> IndexMap<String, String> {
    let mut headers: IndexMap<String, String> = IndexMap::new();
    for (name, value) in raw {
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        match headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(if name == "cookie" { "; " } else { ", " });
                existing.push_str(value);
            }
            None => {
                headers.insert(name, value.to_string());
            }
        }
    }
    headers
}

fn parse_query(query: Option<&str>) -> ParamMap {
    let mut params = ParamMap::new();
    if let Some(q) = query {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            accumulate(&mut params, k.into_owned(), v.into_owned());
        }
    }
    params
}

fn parse_cookies(header: &str) -> IndexMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// Resolve the client address: forwarded chain first hop, then
/// `x-real-ip`, then `cf-connecting-ip`, then the socket.
fn client_info(raw: &RawRequest, headers: &IndexMap<String, String>) -> ClientInfo {
    let forwarded_for: Vec<String> = headers
        .get("x-forwarded-for")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let ip = forwarded_for
        .first()
        .cloned()
        .or_else(|| headers.get("x-real-ip").cloned())
        .or_else(|| headers.get("cf-connecting-ip").cloned())
        .or_else(|| raw.remote_addr.map(|a| a.ip().to_string()));

    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .map(|p| p.to_ascii_lowercase());
    let secure = raw.secure || forwarded_proto.as_deref() == Some("https");
    let protocol = forwarded_proto.unwrap_or_else(|| {
        if raw.secure { "https" } else { "http" }.to_string()
    });

    ClientInfo {
        ip,
        user_agent: headers.get("user-agent").cloned(),
        forwarded_for,
        protocol,
        secure,
        http_version: raw.http_version.clone(),
    }
}

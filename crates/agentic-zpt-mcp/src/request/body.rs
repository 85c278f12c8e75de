//! Body decoding by media type, and conversion to verb arguments.

use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Map, Value};

use super::validators::media_type;
use super::{accumulate, multipart, ParamMap, ParseError, RequestBody};

/// Decode a fully-read body according to its content type.
pub async fn parse_body(
    content_type: Option<&str>,
    bytes: Bytes,
) -> Result<RequestBody, ParseError> {
    if bytes.is_empty() {
        return Ok(RequestBody::Absent);
    }

    let Some(content_type) = content_type else {
        return Ok(RequestBody::Raw(bytes));
    };
    let media = media_type(content_type);

    if media == "application/json" || media.ends_with("+json") {
        return serde_json::from_slice(&bytes)
            .map(RequestBody::Json)
            .map_err(|e| ParseError::MalformedJson(e.to_string()));
    }

    if media == "application/x-www-form-urlencoded" {
        let mut form = ParamMap::new();
        for (k, v) in url::form_urlencoded::parse(&bytes) {
            accumulate(&mut form, k.into_owned(), v.into_owned());
        }
        return Ok(RequestBody::Form(form));
    }

    if media == "multipart/form-data" {
        let boundary = multipart::boundary(content_type).ok_or(ParseError::MissingBoundary)?;
        let (fields, files) = multipart::parse(bytes, &boundary).await?;
        return Ok(RequestBody::Multipart { fields, files });
    }

    if media.starts_with("text/") {
        return String::from_utf8(bytes.to_vec())
            .map(RequestBody::Text)
            .map_err(|_| ParseError::InvalidEncoding(format!("{media} body is not UTF-8")));
    }

    Ok(RequestBody::Raw(bytes))
}

/// Query parameters that steer the request rather than feed the verb.
const CONTROL_PARAMS: [&str; 3] = ["session", "links", "compress"];

/// Flatten a body plus query parameters into a verb argument object.
/// Body keys win over query keys.
pub fn body_to_args(body: &RequestBody, query: &ParamMap) -> Value {
    let b64 = base64::engine::general_purpose::STANDARD;

    let mut args = match body {
        RequestBody::Json(Value::Object(map)) => map.clone(),
        RequestBody::Json(Value::Null) | RequestBody::Absent => Map::new(),
        RequestBody::Json(other) => {
            let mut m = Map::new();
            m.insert("value".to_string(), other.clone());
            m
        }
        RequestBody::Form(form) => form
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect(),
        RequestBody::Multipart { fields, files } => {
            let mut m: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            if !files.is_empty() {
                let files: Vec<Value> = files
                    .iter()
                    .map(|f| {
                        json!({
                            "name": f.name,
                            "filename": f.filename,
                            "contentType": f.content_type,
                            "size": f.content.len(),
                            "content": b64.encode(&f.content),
                        })
                    })
                    .collect();
                m.insert("files".to_string(), json!(files));
            }
            m
        }
        RequestBody::Text(text) => {
            let mut m = Map::new();
            m.insert("content".to_string(), json!(text));
            m
        }
        RequestBody::Raw(bytes) => {
            let mut m = Map::new();
            m.insert("content".to_string(), json!(b64.encode(bytes)));
            m.insert("encoding".to_string(), json!("base64"));
            m
        }
    };

    for (k, v) in query {
        if !CONTROL_PARAMS.contains(&k.as_str()) && !args.contains_key(k) {
            args.insert(k.clone(), v.to_value());
        }
    }

    Value::Object(args)
}

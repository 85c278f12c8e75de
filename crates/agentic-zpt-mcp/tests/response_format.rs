//! Envelope shaping: shape detection, sanitization, post-processing, and
//! the formatter's refusal to fail.

use serde_json::{json, Value};

use agentic_zpt_mcp::config::ResponseConfig;
use agentic_zpt_mcp::response::envelope::{PageRequest, Pagination, ResponseType};
use agentic_zpt_mcp::response::postprocess::{compress, links};
use agentic_zpt_mcp::response::sanitize::{is_sensitive_key, DEPTH_SENTINEL, MAX_DEPTH};
use agentic_zpt_mcp::response::shapes::{detect, truncate_preview, PREVIEW_CHARS};
use agentic_zpt_mcp::response::{sanitize_data, FormatContext, ResponseFormatter};

// ─────────────────────── helpers ───────────────────────

fn formatter() -> ResponseFormatter {
    ResponseFormatter::new(&ResponseConfig::default())
}

fn format(data: Value) -> Value {
    formatter().format(&data, &FormatContext::new()).to_value()
}

fn outcome() -> Value {
    json!({
        "zoom": "entity",
        "tilt": "keywords",
        "pan": { "domains": ["ai", "memory", "graphs", "rdf"], "keywords": [] },
        "query": "semantic memory",
        "content": ["first chunk", "second chunk"],
        "corpuscles": [{ "id": "c1" }, { "id": "c2" }],
        "matchedItems": 2,
        "totalItems": 10,
        "tokenCount": 12,
        "truncated": false,
    })
}

fn nested(depth: usize) -> Value {
    let mut v = json!("leaf");
    for _ in 0..depth {
        v = json!({ "child": v });
    }
    v
}

// ═══════════════════════════════════════════════════════
// SHAPE DETECTION
// ═══════════════════════════════════════════════════════

#[test]
fn test_shape_detection() {
    let cases = vec![
        (json!({ "success": false }), ResponseType::Error),
        (json!({ "error": { "code": "X" } }), ResponseType::Error),
        (outcome(), ResponseType::Navigation),
        (json!({ "navigation": outcome(), "previousZoom": "unit" }), ResponseType::Navigation),
        (json!({ "preview": {} }), ResponseType::Preview),
        (json!({ "options": {} }), ResponseType::Options),
        (json!({ "schema": {} }), ResponseType::Schema),
        (json!({ "status": "ok", "checks": {} }), ResponseType::Health),
        (json!({ "metrics": {} }), ResponseType::Metrics),
        (json!({ "stored": true }), ResponseType::Success),
        (json!([1, 2, 3]), ResponseType::Success),
        (json!({ "zoom": "unit", "tilt": "graph" }), ResponseType::Success),
        (json!({ "status": "stored" }), ResponseType::Success),
        (json!({ "error": "just text" }), ResponseType::Success),
    ];
    for (data, expected) in cases {
        assert_eq!(detect(&data), expected, "{data}");
    }
    println!("TEST shape_detection: PASS");
}

#[test]
fn test_error_detection_wins_over_navigation() {
    let mut data = outcome();
    data["success"] = json!(false);
    assert_eq!(detect(&data), ResponseType::Error);
    println!("TEST error_detection_wins_over_navigation: PASS");
}

// ═══════════════════════════════════════════════════════
// SHAPES
// ═══════════════════════════════════════════════════════

#[test]
fn test_navigation_shape() {
    let resp = format(json!({ "navigation": outcome(), "previousZoom": "unit" }));

    assert_eq!(resp["success"], true);
    assert_eq!(resp["metadata"]["responseType"], "navigation");
    let data = &resp["data"];
    assert_eq!(data["navigation"]["zoom"], "entity");
    assert_eq!(data["navigation"]["tilt"], "keywords");
    assert_eq!(data["navigation"]["query"], "semantic memory");
    assert_eq!(data["navigation"]["pan"]["applied"], true);
    assert_eq!(data["navigation"]["pan"]["filters"]["domains"]["count"], 4);
    assert_eq!(
        data["navigation"]["pan"]["filters"]["domains"]["sample"],
        json!(["ai", "memory", "graphs"])
    );
    assert_eq!(data["content"]["preview"], "first chunk\nsecond chunk");
    assert_eq!(data["content"]["chunks"], 2);
    assert_eq!(data["stats"]["corpuscleCount"], 2);
    assert_eq!(data["stats"]["totalItems"], 10);
    assert_eq!(data["previousZoom"], "unit", "verb keys are carried over");
    println!("TEST navigation_shape: PASS");
}

#[test]
fn test_long_content_is_truncated() {
    let long = "x".repeat(PREVIEW_CHARS + 50);
    let mut data = outcome();
    data["content"] = json!(long);

    let resp = format(data);
    let preview = resp["data"]["content"]["preview"].as_str().unwrap();
    assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    assert!(preview.ends_with("..."));

    assert_eq!(truncate_preview("short"), "short");
    println!("TEST long_content_is_truncated: PASS");
}

#[test]
fn test_preview_options_schema_health_metrics() {
    let resp = format(json!({
        "preview": { "zoom": "unit", "estimatedItems": 3, "sample": ["a", "b"] }
    }));
    assert_eq!(resp["metadata"]["responseType"], "preview");
    assert_eq!(resp["data"]["preview"]["estimatedItems"], 3);
    assert_eq!(resp["data"]["preview"]["pan"]["applied"], false);

    let resp = format(json!({ "options": { "zoomLevels": ["a", "b"], "flag": true } }));
    assert_eq!(resp["data"]["counts"], json!({ "zoomLevels": 2 }));

    let f = formatter();
    let resp = f
        .format(&json!({ "schema": { "verbs": {} } }), &FormatContext::new())
        .to_value();
    assert_eq!(resp["data"]["schemaVersion"], f.version());

    let resp = format(json!({ "status": "degraded", "uptimeSecs": 5 }));
    assert_eq!(resp["metadata"]["responseType"], "health");
    assert_eq!(resp["data"]["healthy"], false);
    assert_eq!(resp["data"]["checks"], json!({}));

    let resp = format(json!({ "metrics": { "sessions": 1 } }));
    assert_eq!(resp["data"]["metrics"]["sessions"], 1);
    assert!(resp["data"]["collectedAt"].is_string());
    println!("TEST preview_options_schema_health_metrics: PASS");
}

#[test]
fn test_error_shaped_payload() {
    let resp = format(json!({
        "success": false,
        "error": { "code": "INVALID_ZOOM_LEVEL", "message": "bad zoom", "field": "level" }
    }));
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error"]["code"], "INVALID_ZOOM_LEVEL");
    assert_eq!(resp["error"]["type"], "VALIDATION_ERROR");
    assert_eq!(resp["error"]["statusCode"], 400);
    assert_eq!(resp["error"]["field"], "level");
    assert_eq!(resp["metadata"]["responseType"], "error");

    let resp = format(json!({ "error": { "message": "mystery" } }));
    assert_eq!(resp["error"]["code"], "UNKNOWN");
    assert_eq!(resp["error"]["message"], "mystery");
    println!("TEST error_shaped_payload: PASS");
}

// ═══════════════════════════════════════════════════════
// NEVER FAILS
// ═══════════════════════════════════════════════════════

#[test]
fn test_malformed_shape_becomes_formatting_error() {
    let mut data = outcome();
    data["content"] = json!([1, 2]);

    let envelope = formatter().format(&data, &FormatContext::new());
    assert!(!envelope.is_success());
    let resp = envelope.to_value();
    assert_eq!(resp["error"]["code"], "FORMATTING_ERROR");
    assert_eq!(resp["error"]["type"], "PROCESSING_ERROR");
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("navigation payload is malformed"));

    let resp = format(json!({ "status": "ok", "checks": {}, "metrics": 3 }));
    assert_eq!(resp["success"], true);
    println!("TEST malformed_shape_becomes_formatting_error: PASS");
}

#[test]
fn test_envelope_metadata() {
    let ctx = FormatContext::new().with_session("s-9").with_verb("zoom");
    let request_id = ctx.request_id.clone();
    let envelope = formatter().format(&json!({ "ok": 1 }), &ctx);

    assert_eq!(envelope.request_id(), request_id);
    assert_eq!(envelope.status_code(), 200);
    let resp = envelope.to_value();
    assert_eq!(resp["requestId"], request_id);
    assert_eq!(resp["metadata"]["sessionId"], "s-9");
    assert_eq!(resp["metadata"]["verb"], "zoom");
    assert_eq!(resp["metadata"]["responseType"], "success");
    assert!(resp["metadata"]["processingTimeMs"].is_u64());
    assert!(resp.get("links").is_none());
    assert!(resp.get("pagination").is_none());
    println!("TEST envelope_metadata: PASS");
}

// ═══════════════════════════════════════════════════════
// SANITIZATION
// ═══════════════════════════════════════════════════════

#[test]
fn test_sensitive_keys() {
    for key in [
        "apiKey",
        "api_key",
        "access_token",
        "client-secret",
        "password",
        "passwordHash",
        "authHeader",
        "Authorization",
        "credentials",
        "sessionCookie",
        "secrets",
        "passwords",
        "apiKeys",
        "sessionTokenId",
        "privateKeyPem",
        "clientSecretValue",
        "authorization_header",
    ] {
        assert!(is_sensitive_key(key), "{key} should be sensitive");
    }
    for key in [
        "keywords",
        "maxTokens",
        "tokenCount",
        "author",
        "monkey",
        "keyboard",
        "max_tokens",
        "estimatedTokens",
        "authors",
        "zoom",
        "",
    ] {
        assert!(!is_sensitive_key(key), "{key} should be kept");
    }
    println!("TEST sensitive_keys: PASS");
}

#[test]
fn test_sanitize_data_removes_secrets_recursively() {
    let data = json!({
        "keywords": ["a"],
        "maxTokens": 100,
        "apiKey": "sk-123",
        "nested": { "access_token": "t", "items": [{ "password": "p", "name": "n" }] },
    });
    let clean = sanitize_data(&data);
    assert_eq!(
        clean,
        json!({
            "keywords": ["a"],
            "maxTokens": 100,
            "nested": { "items": [{ "name": "n" }] },
        })
    );

    let resp = format(json!({ "result": "done", "secret": "hunter2" }));
    assert!(resp["data"].get("secret").is_none());
    assert_eq!(resp["data"]["result"], "done");
    println!("TEST sanitize_data_removes_secrets_recursively: PASS");
}

#[test]
fn test_depth_sentinel() {
    let shallow = nested(MAX_DEPTH);
    assert_eq!(sanitize_data(&shallow), shallow);

    let deep = nested(MAX_DEPTH + 5);
    let mut cursor = &sanitize_data(&deep);
    let mut depth = 0;
    while let Some(child) = cursor.get("child") {
        cursor = child;
        depth += 1;
    }
    assert_eq!(cursor, &json!(DEPTH_SENTINEL));
    assert_eq!(depth, MAX_DEPTH + 1);
    println!("TEST depth_sentinel: PASS");
}

// ═══════════════════════════════════════════════════════
// POST-PROCESSING
// ═══════════════════════════════════════════════════════

#[test]
fn test_compress() {
    let value = json!({
        "a": null,
        "b": "",
        "c": {},
        "d": { "e": null },
        "f": [null, "", 0],
        "g": false,
        "h": [],
        "i": "kept",
    });
    assert_eq!(
        compress(value),
        json!({ "f": [null, "", 0], "g": false, "h": [], "i": "kept" })
    );
    println!("TEST compress: PASS");
}

#[test]
fn test_compress_and_links_via_context() {
    let mut ctx = FormatContext::new().with_verb("zoom");
    ctx.compress = Some(true);
    ctx.include_links = Some(true);

    let resp = formatter()
        .format(&json!({ "stored": true, "note": null }), &ctx)
        .to_value();
    assert!(resp["data"].get("note").is_none());
    assert_eq!(resp["links"]["self"], "/api/verbs/zoom");
    assert_eq!(resp["links"]["options"], "/api/zpt/options");

    let with_links = ResponseFormatter::new(&ResponseConfig {
        include_links: true,
        ..Default::default()
    });
    let mut ctx = FormatContext::new();
    ctx.include_links = Some(false);
    let resp = with_links.format(&json!({ "x": 1 }), &ctx).to_value();
    assert!(resp.get("links").is_none(), "context overrides config");
    println!("TEST compress_and_links_via_context: PASS");
}

#[test]
fn test_links_by_type() {
    let nav = links(ResponseType::Navigation, Some("/api/verbs/zoom"), None);
    assert_eq!(nav["self"], "/api/verbs/zoom");
    assert_eq!(nav["preview"], "/api/zpt/preview");

    let health = links(ResponseType::Health, None, None);
    assert_eq!(health["metrics"], "/metrics");
    assert!(health.get("self").is_none());

    let err = links(ResponseType::Error, None, Some("tilt"));
    assert_eq!(err["self"], "/api/verbs/tilt");
    assert!(err.get("documentation").is_some());
    println!("TEST links_by_type: PASS");
}

#[test]
fn test_pagination() {
    let p = Pagination::from(PageRequest {
        page: 2,
        limit: 10,
        total: 25,
    });
    assert_eq!(p.total_pages, 3);
    assert!(p.has_next);
    assert!(p.has_prev);

    let p = Pagination::from(PageRequest {
        page: 0,
        limit: 0,
        total: 0,
    });
    assert_eq!((p.page, p.limit, p.total_pages), (1, 1, 0));
    assert!(!p.has_next);
    assert!(!p.has_prev);

    let mut ctx = FormatContext::new();
    ctx.pagination = Some(PageRequest {
        page: 1,
        limit: 5,
        total: 6,
    });
    let resp = formatter().format(&json!({ "items": [] }), &ctx).to_value();
    assert_eq!(resp["pagination"]["totalPages"], 2);
    assert_eq!(resp["pagination"]["hasNext"], true);
    println!("TEST pagination: PASS");
}

//! HTTP routes end to end through the axum router, without a socket.
#![cfg(feature = "http")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use agentic_zpt_mcp::config::ZptConfig;
use agentic_zpt_mcp::service::ZptService;
use agentic_zpt_mcp::transport::http::{router, ServerState, REQUEST_ID_HEADER};

// ─────────────────────── helpers ───────────────────────

fn app_with(config: ZptConfig, token: Option<&str>) -> (Router, Arc<ZptService>) {
    let service = Arc::new(ZptService::new(config));
    let state = Arc::new(ServerState::new(service.clone(), token.map(str::to_string)));
    (router(state), service)
}

fn app() -> Router {
    app_with(ZptConfig::default(), None).0
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", "localhost")
        .header("user-agent", "zpt-tests")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("host", "localhost")
        .header("user-agent", "zpt-tests")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request and return the status plus the decoded JSON body.
async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ═══════════════════════════════════════════════════════
// DISCOVERY ROUTES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["responseType"], "health");
    assert_eq!(body["data"]["healthy"], true);
    assert_eq!(body["data"]["checks"]["recovery"], "enabled");
    println!("TEST health: PASS");
}

#[tokio::test]
async fn test_options_and_schema() {
    let (status, body) = send(app(), get("/api/zpt/options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["responseType"], "options");
    assert_eq!(body["data"]["counts"]["zoomLevels"], 6);
    assert_eq!(body["data"]["counts"]["verbs"], 12);

    let (status, body) = send(app(), get("/api/zpt/schema")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["responseType"], "schema");
    assert!(body["data"]["schema"]["verbs"]["zoom"].is_object());
    println!("TEST options_and_schema: PASS");
}

#[tokio::test]
async fn test_metrics_counts_errors() {
    let (app, _service) = app_with(ZptConfig::default(), None);
    let _ = send(
        app.clone(),
        post_json("/api/verbs/zoom", json!({ "level": "galaxy" })),
    )
    .await;

    let (status, body) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["responseType"], "metrics");
    assert_eq!(body["data"]["metrics"]["errors"]["total"], 1);
    assert_eq!(
        body["data"]["metrics"]["errors"]["byCode"]["INVALID_ZOOM_LEVEL"],
        1
    );
    println!("TEST metrics_counts_errors: PASS");
}

// ═══════════════════════════════════════════════════════
// VERB ROUTES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_verb_post_uses_session_header() {
    let (app, service) = app_with(ZptConfig::default(), None);
    let mut request = post_json("/api/verbs/zoom", json!({ "level": "entity" }));
    request
        .headers_mut()
        .insert("x-session-id", "web-1".parse().unwrap());

    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["zoom"], "entity");
    assert_eq!(body["metadata"]["sessionId"], "web-1");
    assert_eq!(body["metadata"]["verb"], "zoom");

    let (_, body) = send(app, get("/api/verbs/inspect?session=web-1&what=zpt")).await;
    assert_eq!(body["data"]["zpt"]["zoom"], "entity");
    assert_eq!(service.sessions().count().await, 1);
    println!("TEST verb_post_uses_session_header: PASS");
}

#[tokio::test]
async fn test_verb_get_reads_query() {
    let (status, body) = send(app(), get("/api/verbs/tilt?style=graph&links=true")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["tilt"], "graph");
    assert_eq!(body["links"]["self"], "/api/verbs/tilt");
    println!("TEST verb_get_reads_query: PASS");
}

#[tokio::test]
async fn test_verb_failures() {
    let (status, body) = send(app(), post_json("/api/verbs/fly", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_VERB");

    let (status, body) = send(
        app(),
        post_json("/api/verbs/zoom", json!({ "level": "galaxy" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ZOOM_LEVEL");
    assert_eq!(body["error"]["field"], "zoom");
    assert_eq!(body["recovery"]["recovered"], true);

    let put = Request::builder()
        .method("PUT")
        .uri("/api/verbs/zoom")
        .header("host", "localhost")
        .header("user-agent", "zpt-tests")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), put).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "REQUEST_VALIDATION_FAILED");
    println!("TEST verb_failures: PASS");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/verbs/zoom")
        .header("host", "localhost")
        .header("user-agent", "zpt-tests")
        .header("content-type", "application/json")
        .body(Body::from("{\"level\":"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_JSON_BODY");
    println!("TEST malformed_json_body: PASS");
}

#[tokio::test]
async fn test_streamed_body_over_limit() {
    let mut config = ZptConfig::default();
    config.request.max_body_size = 32;
    let (app, _) = app_with(config, None);

    let body = json!({ "content": "x".repeat(200) });
    let (_, resp) = send(app, post_json("/api/verbs/tell", body)).await;
    assert_eq!(resp["error"]["code"], "REQUEST_TOO_LARGE");
    println!("TEST streamed_body_over_limit: PASS");
}

#[tokio::test]
async fn test_preview_route() {
    let (app, _) = app_with(ZptConfig::default(), None);
    let _ = send(
        app.clone(),
        post_json(
            "/api/verbs/tell",
            json!({ "content": "Ragno builds knowledge graphs from text." }),
        ),
    )
    .await;

    let (status, body) = send(
        app,
        post_json(
            "/api/zpt/preview",
            json!({ "query": "knowledge graphs", "zoom": "unit" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["metadata"]["responseType"], "preview");
    assert_eq!(body["data"]["preview"]["zoom"], "unit");
    println!("TEST preview_route: PASS");
}

// ═══════════════════════════════════════════════════════
// FALLBACK, AUTH, HEADERS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = send(app(), get("/no/such/route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ROUTE_NOT_FOUND");
    assert_eq!(body["error"]["type"], "NOT_FOUND_ERROR");
    println!("TEST unknown_route: PASS");
}

#[tokio::test]
async fn test_bearer_token() {
    let (app, _) = app_with(ZptConfig::default(), Some("s3cret"));

    let (status, body) = send(app.clone(), get("/api/zpt/options")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_REQUIRED");

    let mut wrong = get("/api/zpt/options");
    wrong
        .headers_mut()
        .insert("authorization", "Bearer nope".parse().unwrap());
    let (status, _) = send(app.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut right = get("/api/zpt/options");
    right
        .headers_mut()
        .insert("authorization", "Bearer s3cret".parse().unwrap());
    let (status, _) = send(app.clone(), right).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK, "health bypasses auth");
    println!("TEST bearer_token: PASS");
}

#[tokio::test]
async fn test_request_id_header_matches_body() {
    let response = app().oneshot(get("/api/zpt/options")).await.unwrap();
    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["requestId"], header);
    println!("TEST request_id_header_matches_body: PASS");
}

// ═══════════════════════════════════════════════════════
// JSON-RPC
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_rpc_over_http() {
    let (status, body) = send(
        app(),
        post_json("/mcp", json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 13);

    let (status, body) = send(
        app(),
        post_json(
            "/mcp",
            json!({
                "jsonrpc": "2.0",
                "id": "call-1",
                "method": "tools/call",
                "params": { "name": "zoom", "arguments": { "level": "community" } }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let envelope: Value = serde_json::from_str(text).unwrap();
    assert_eq!(envelope["data"]["zoom"], "community");
    println!("TEST rpc_over_http: PASS");
}

#[tokio::test]
async fn test_rpc_notification_and_parse_error() {
    let (status, body) = send(
        app(),
        post_json("/mcp", json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);

    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
    println!("TEST rpc_notification_and_parse_error: PASS");
}

//! Request normalization: validators, body decoding, limits, and the
//! client/cookie/query views the dispatcher reads.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;

use agentic_zpt_mcp::config::RequestConfig;
use agentic_zpt_mcp::request::{
    body_to_args, multipart, parse_body, read_body, validators, BodyStream, HttpMethod,
    ParseError, RawRequest, RequestBody, RequestParser,
};

// ─────────────────────── helpers ───────────────────────

fn parser() -> RequestParser {
    RequestParser::new(RequestConfig::default())
}

fn strict_parser() -> RequestParser {
    RequestParser::new(RequestConfig {
        strict: true,
        ..Default::default()
    })
}

/// A POST carrying the headers a well-behaved client sends.
fn post(uri: &str, content_type: &str, body: &'static str) -> RawRequest {
    RawRequest::new("POST", uri)
        .with_header("Host", "localhost")
        .with_header("User-Agent", "zpt-tests")
        .with_header("Content-Type", content_type)
        .with_body(body)
}

fn get(uri: &str) -> RawRequest {
    RawRequest::new("GET", uri)
        .with_header("Host", "localhost")
        .with_header("User-Agent", "zpt-tests")
}

fn chunks(parts: Vec<&'static [u8]>) -> BodyStream {
    Box::pin(futures::stream::iter(
        parts
            .into_iter()
            .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p))),
    ))
}

fn issue_messages(err: &ParseError) -> Vec<String> {
    match err {
        ParseError::Validation { issues } => issues.iter().map(|i| i.message.clone()).collect(),
        other => panic!("expected a validation failure, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════
// NORMALIZATION
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_json_post_is_normalized() {
    let raw = post(
        "/api/verbs/zoom?session=abc&tag=a&tag=b",
        "application/json; charset=utf-8",
        r#"{"level":"entity"}"#,
    )
    .with_header("X-Session-Id", "s-1")
    .with_header("Cookie", "zpt_session=c-1; theme=\"dark\"");

    let req = parser().parse(raw).await.unwrap();

    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(req.path, "/api/verbs/zoom");
    assert_eq!(req.body, RequestBody::Json(json!({ "level": "entity" })));
    assert_eq!(req.header("x-session-id"), Some("s-1"));
    assert_eq!(req.header("X-SESSION-ID"), Some("s-1"));
    assert_eq!(req.cookie("zpt_session"), Some("c-1"));
    assert_eq!(req.cookie("theme"), Some("dark"));
    assert_eq!(req.query_param("session"), Some("abc"));
    assert_eq!(req.query["tag"].to_value(), json!(["a", "b"]));
    assert!(req.warnings.is_empty(), "unexpected warnings: {:?}", req.warnings);
    println!("TEST json_post_is_normalized: PASS");
}

#[tokio::test]
async fn test_get_ignores_body() {
    let raw = get("/api/zpt/options").with_body("ignored");
    let req = parser().parse(raw).await.unwrap();
    assert!(req.body.is_absent());
    println!("TEST get_ignores_body: PASS");
}

#[tokio::test]
async fn test_repeated_headers_are_joined() {
    let raw = get("/")
        .with_header("Accept", "text/plain")
        .with_header("accept", "application/json")
        .with_header("Cookie", "a=1")
        .with_header("Cookie", "b=2");
    let req = parser().parse(raw).await.unwrap();
    assert_eq!(req.header("accept"), Some("text/plain, application/json"));
    assert_eq!(req.cookie("a"), Some("1"));
    assert_eq!(req.cookie("b"), Some("2"));
    println!("TEST repeated_headers_are_joined: PASS");
}

#[tokio::test]
async fn test_client_ip_precedence() {
    let socket: SocketAddr = "10.0.0.9:5555".parse().unwrap();

    let req = parser()
        .parse(
            get("/")
                .with_remote_addr(socket)
                .with_header("X-Real-IP", "172.16.0.2")
                .with_header("X-Forwarded-For", "203.0.113.7, 10.1.1.1")
                .with_header("X-Forwarded-Proto", "https"),
        )
        .await
        .unwrap();
    assert_eq!(req.client.ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(req.client.forwarded_for, vec!["203.0.113.7", "10.1.1.1"]);
    assert_eq!(req.client.protocol, "https");
    assert!(req.client.secure);

    let req = parser()
        .parse(
            get("/")
                .with_remote_addr(socket)
                .with_header("X-Real-IP", "172.16.0.2"),
        )
        .await
        .unwrap();
    assert_eq!(req.client.ip.as_deref(), Some("172.16.0.2"));

    let req = parser()
        .parse(
            get("/")
                .with_remote_addr(socket)
                .with_header("CF-Connecting-IP", "198.51.100.4"),
        )
        .await
        .unwrap();
    assert_eq!(req.client.ip.as_deref(), Some("198.51.100.4"));

    let req = parser().parse(get("/").with_remote_addr(socket)).await.unwrap();
    assert_eq!(req.client.ip.as_deref(), Some("10.0.0.9"));
    assert_eq!(req.client.protocol, "http");
    assert!(!req.client.secure);
    assert_eq!(req.client.user_agent.as_deref(), Some("zpt-tests"));
    println!("TEST client_ip_precedence: PASS");
}

// ═══════════════════════════════════════════════════════
// VALIDATORS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_missing_headers_warn_unless_strict() {
    let raw = || RawRequest::new("POST", "/api/verbs/zoom").with_body(r#"{"level":"unit"}"#);

    let req = parser().parse(raw()).await.unwrap();
    let validators: Vec<&str> = req.warnings.iter().map(|w| w.validator.as_str()).collect();
    assert!(validators.contains(&"content_type"));
    assert!(validators.contains(&"headers"));
    assert_eq!(req.warnings.len(), 3, "host, user-agent, content-type");
    assert!(matches!(req.body, RequestBody::Raw(_)));

    let err = strict_parser().parse(raw()).await.unwrap_err();
    assert_eq!(err.code(), "REQUEST_VALIDATION_FAILED");
    assert_eq!(issue_messages(&err).len(), 3);
    println!("TEST missing_headers_warn_unless_strict: PASS");
}

#[tokio::test]
async fn test_unknown_content_type() {
    let raw = || post("/x", "application/xml", "<a/>");

    let req = parser().parse(raw()).await.unwrap();
    assert!(req
        .warnings
        .iter()
        .any(|w| w.message.contains("application/xml")));
    assert!(matches!(req.body, RequestBody::Raw(_)));

    let err = strict_parser().parse(raw()).await.unwrap_err();
    assert!(issue_messages(&err)[0].contains("unsupported content type"));
    println!("TEST unknown_content_type: PASS");
}

#[tokio::test]
async fn test_disallowed_methods() {
    for method in ["PUT", "PATCH", "DELETE"] {
        let raw = RawRequest::new(method, "/api/verbs/zoom")
            .with_header("Host", "localhost")
            .with_header("User-Agent", "zpt-tests");
        let err = parser().parse(raw).await.unwrap_err();
        assert_eq!(err.code(), "REQUEST_VALIDATION_FAILED");
        assert!(issue_messages(&err)[0].contains("not allowed"), "{method}");
    }

    let err = parser()
        .parse(RawRequest::new("BREW", "/").with_header("Host", "h"))
        .await
        .unwrap_err();
    assert!(issue_messages(&err)[0].contains("unknown method"));

    assert!(parser().parse(RawRequest::new("options", "/")).await.is_ok());
    println!("TEST disallowed_methods: PASS");
}

#[tokio::test]
async fn test_path_rules() {
    let config = RequestConfig {
        max_path_length: 32,
        ..Default::default()
    };

    for bad in [
        "/api/../etc/passwd",
        "/api/..%2F..%2Fsecret",
        "/api/<script>alert(1)</script>",
        "/api/JavaScript:void",
        "/api\\verbs",
    ] {
        let issues = validators::path(&RawRequest::new("GET", bad), &config);
        assert_eq!(issues.len(), 1, "{bad} should be rejected");
        assert!(issues[0].is_critical());
    }

    let long = format!("/{}", "a".repeat(40));
    let issues = validators::path(&RawRequest::new("GET", long), &config);
    assert!(issues[0].message.contains("exceeds 32"));

    let issues = validators::path(&RawRequest::new("GET", "/api/verbs/zoom?q=../x"), &config);
    assert!(issues.is_empty(), "query strings are not part of the path");

    let issues = validators::path(&RawRequest::new("GET", ""), &config);
    assert_eq!(issues[0].message, "path is empty");
    println!("TEST path_rules: PASS");
}

#[tokio::test]
async fn test_header_control_characters_are_fatal() {
    let raw = get("/").with_header("X-Injected", "a\r\nSet-Cookie: evil=1");
    let err = parser().parse(raw).await.unwrap_err();
    assert!(issue_messages(&err)[0].contains("X-Injected"));

    let config = RequestConfig {
        max_headers: 2,
        ..Default::default()
    };
    let raw = get("/").with_header("A", "1");
    let issues = validators::headers(&raw, &config);
    assert!(issues.iter().any(|i| i.message == "more than 2 headers"));
    println!("TEST header_control_characters_are_fatal: PASS");
}

#[tokio::test]
async fn test_run_all_collects_every_finding() {
    let raw = RawRequest::new("DELETE", "/../x").with_header("Content-Length", "abc");
    let issues = validators::run_all(&raw, &RequestConfig::default());
    let names: Vec<&str> = issues.iter().map(|i| i.validator.as_str()).collect();
    assert!(names.contains(&"body_size"));
    assert!(names.contains(&"method"));
    assert!(names.contains(&"path"));
    assert!(names.contains(&"headers"));
    println!("TEST run_all_collects_every_finding: PASS");
}

// ═══════════════════════════════════════════════════════
// BODY LIMITS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_declared_length_over_cap() {
    let parser = RequestParser::new(RequestConfig {
        max_body_size: 16,
        ..Default::default()
    });
    let raw = post("/x", "application/json", "{}").with_header("Content-Length", "1024");

    let err = parser.parse(raw).await.unwrap_err();
    assert!(matches!(err, ParseError::BodyTooLarge { limit: 16 }));
    assert_eq!(err.code(), "REQUEST_TOO_LARGE");
    assert_eq!(err.details(), Some(json!({ "maxBodySize": 16 })));
    println!("TEST declared_length_over_cap: PASS");
}

#[tokio::test]
async fn test_non_numeric_length_is_a_validation_failure() {
    let raw = post("/x", "application/json", "{}").with_header("Content-Length", "lots");
    let err = parser().parse(raw).await.unwrap_err();
    assert!(matches!(err, ParseError::Validation { .. }));
    assert_eq!(err.code(), "REQUEST_VALIDATION_FAILED");
    assert!(issue_messages(&err).iter().any(|m| m.contains("not a number")));
    println!("TEST non_numeric_length_is_a_validation_failure: PASS");
}

#[tokio::test]
async fn test_streamed_body_over_cap() {
    let stream = chunks(vec![b"0123456789", b"0123456789", b"0123456789"]);
    let err = read_body(stream, 25, Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, ParseError::BodyTooLarge { limit: 25 }));

    let stream = chunks(vec![b"0123456789", b"01234"]);
    let bytes = read_body(stream, 15, Duration::from_secs(5)).await.unwrap();
    assert_eq!(bytes.len(), 15, "exactly at the limit is accepted");

    let parser = RequestParser::new(RequestConfig {
        max_body_size: 8,
        ..Default::default()
    });
    let raw = RawRequest::new("POST", "/x")
        .with_header("Content-Type", "text/plain")
        .with_stream(chunks(vec![b"12345", b"67890"]));
    assert_eq!(parser.parse(raw).await.unwrap_err().code(), "REQUEST_TOO_LARGE");
    println!("TEST streamed_body_over_cap: PASS");
}

#[tokio::test]
async fn test_body_read_times_out() {
    let parser = parser().with_body_timeout(Duration::from_millis(50));
    let stalled: BodyStream = Box::pin(futures::stream::pending::<std::io::Result<Bytes>>());
    let raw = RawRequest::new("POST", "/x")
        .with_header("Content-Type", "application/json")
        .with_stream(stalled);

    let err = parser.parse(raw).await.unwrap_err();
    assert_eq!(err.code(), "REQUEST_TIMEOUT");
    assert_eq!(err.details(), Some(json!({ "timeoutMs": 50 })));
    println!("TEST body_read_times_out: PASS");
}

#[tokio::test]
async fn test_stream_error_surfaces() {
    let broken: BodyStream = Box::pin(futures::stream::iter(vec![
        Ok(Bytes::from_static(b"{")),
        Err(std::io::Error::other("connection reset")),
    ]));
    let err = read_body(broken, 1024, Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, ParseError::BodyRead(_)));
    println!("TEST stream_error_surfaces: PASS");
}

// ═══════════════════════════════════════════════════════
// BODY DECODING
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_malformed_json() {
    let err = parser()
        .parse(post("/x", "application/json", r#"{"level": "#))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_JSON_BODY");

    let body = parse_body(
        Some("application/vnd.zpt+json"),
        Bytes::from_static(br#"[1,2]"#),
    )
    .await
    .unwrap();
    assert_eq!(body, RequestBody::Json(json!([1, 2])));
    println!("TEST malformed_json: PASS");
}

#[tokio::test]
async fn test_form_body() {
    let req = parser()
        .parse(post(
            "/x",
            "application/x-www-form-urlencoded",
            "query=semantic+memory&keywords=a&keywords=b",
        ))
        .await
        .unwrap();
    let RequestBody::Form(form) = &req.body else {
        panic!("expected a form body, got {:?}", req.body);
    };
    assert_eq!(form["query"].first(), "semantic memory");
    assert_eq!(form["keywords"].to_value(), json!(["a", "b"]));
    println!("TEST form_body: PASS");
}

#[tokio::test]
async fn test_multipart_fields_and_files() {
    let body = "--X\r\n\
        Content-Disposition: form-data; name=\"query\"\r\n\r\n\
        semantic memory\r\n\
        --X\r\n\
        Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        hello\r\n\
        --X--\r\n";
    let req = parser()
        .parse(post("/x", "multipart/form-data; boundary=X", body))
        .await
        .unwrap();

    let RequestBody::Multipart { fields, files } = &req.body else {
        panic!("expected multipart, got {:?}", req.body);
    };
    assert_eq!(fields["query"], "semantic memory");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "doc");
    assert_eq!(files[0].filename, "notes.txt");
    assert_eq!(files[0].content_type.as_deref(), Some("text/plain"));
    assert_eq!(files[0].content, Bytes::from_static(b"hello"));

    let args = body_to_args(&req.body, &req.query);
    assert_eq!(args["query"], "semantic memory");
    assert_eq!(args["files"][0]["size"], 5);
    assert_eq!(args["files"][0]["content"], "aGVsbG8=");
    println!("TEST multipart_fields_and_files: PASS");
}

#[tokio::test]
async fn test_multipart_failures() {
    let err = parser()
        .parse(post("/x", "multipart/form-data", "--X\r\n--X--"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MISSING_MULTIPART_BOUNDARY");

    assert_eq!(
        multipart::boundary("multipart/form-data; charset=utf-8; boundary=\"abc\""),
        Some("abc".to_string())
    );
    assert_eq!(multipart::boundary("application/json"), None);

    let err = multipart::parse(Bytes::from_static(b"no delimiter here"), "X")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_MULTIPART_BODY");

    let unterminated = Bytes::from_static(b"--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue");
    assert!(multipart::parse(unterminated, "X").await.is_err());

    let nameless = Bytes::from_static(b"--X\r\nContent-Type: text/plain\r\n\r\nvalue\r\n--X--\r\n");
    let err = multipart::parse(nameless, "X").await.unwrap_err();
    assert!(err.to_string().contains("name"));

    let repeated = Bytes::from_static(
        b"--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\none\r\n\
          --X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\ntwo\r\n--X--\r\n",
    );
    let (fields, files) = multipart::parse(repeated, "X").await.unwrap();
    assert_eq!(fields["a"], "two");
    assert!(files.is_empty());
    println!("TEST multipart_failures: PASS");
}

#[tokio::test]
async fn test_text_and_raw_bodies() {
    let body = parse_body(Some("text/plain"), Bytes::from_static(b"hi there"))
        .await
        .unwrap();
    assert_eq!(body, RequestBody::Text("hi there".to_string()));

    let err = parse_body(Some("text/plain"), Bytes::from_static(&[0xff, 0xfe]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_BODY_ENCODING");

    let body = parse_body(None, Bytes::from_static(b"\x00\x01")).await.unwrap();
    let args = body_to_args(&body, &Default::default());
    assert_eq!(args, json!({ "content": "AAE=", "encoding": "base64" }));

    assert!(parse_body(Some("application/json"), Bytes::new())
        .await
        .unwrap()
        .is_absent());
    println!("TEST text_and_raw_bodies: PASS");
}

#[tokio::test]
async fn test_args_merge_query_under_body() {
    let req = parser()
        .parse(post(
            "/api/verbs/zoom?level=corpus&query=memory&session=s1&links=1&compress=true",
            "application/json",
            r#"{"level":"unit"}"#,
        ))
        .await
        .unwrap();
    let args = body_to_args(&req.body, &req.query);
    assert_eq!(args, json!({ "level": "unit", "query": "memory" }));

    let scalar = body_to_args(&RequestBody::Json(json!(42)), &Default::default());
    assert_eq!(scalar, json!({ "value": 42 }));
    println!("TEST args_merge_query_under_body: PASS");
}

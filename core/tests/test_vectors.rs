//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or errors. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use std::time::Duration;

use rewrite_core::{
    FileRewrite, FileRewriteReply, FormPart, HttpMethod, HttpRequest, HttpResponse, RewriteClient, RewriteError,
    ServiceEndpoint, TextRewrite, TextRewriteReply,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:5000";

fn client() -> RewriteClient {
    RewriteClient::new(ServiceEndpoint::new(BASE_URL, Duration::from_secs(300))).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn expected_headers(expected_req: &Value) -> Vec<(String, String)> {
    expected_req["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn assert_method_and_path(name: &str, req: &HttpRequest, expected_req: &Value) {
    assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: path");
}

/// Check an error against `{"kind": ..., "status"?: ..., "message"?: ...}`.
fn assert_expected_error(name: &str, err: &RewriteError, expected: &Value) {
    match expected["kind"].as_str().unwrap() {
        "Service" => {
            assert!(matches!(err, RewriteError::Service { .. }), "{name}: expected Service, got {err:?}");
            assert_eq!(
                err.status().map(u64::from),
                expected["status"].as_u64(),
                "{name}: status"
            );
            if let Some(message) = expected.get("message") {
                assert_eq!(err.service_message().as_deref(), message.as_str(), "{name}: message");
            }
        }
        "Decode" => assert!(matches!(err, RewriteError::Decode(_)), "{name}: expected Decode, got {err:?}"),
        other => panic!("{name}: unknown expected_error kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Rewrite text
// ---------------------------------------------------------------------------

#[test]
fn rewrite_text_test_vectors() {
    let raw = include_str!("../../test-vectors/rewrite_text.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: TextRewrite = serde_json::from_value(case["input"].clone()).unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_submit_text(&input).unwrap();
        assert_method_and_path(name, &req, expected_req);
        assert_eq!(req.headers, expected_headers(expected_req), "{name}: headers");
        let req_body: Value = serde_json::from_str(req.body.as_json().unwrap()).unwrap();
        assert_eq!(req_body, expected_req["body"], "{name}: body");

        // Verify parse
        let result = c.parse_rewrite(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, &result.unwrap_err(), expected_error);
        } else {
            let reply = result.unwrap().text_reply().unwrap();
            let expected: TextRewriteReply = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(reply, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Rewrite file
// ---------------------------------------------------------------------------

#[test]
fn rewrite_file_test_vectors() {
    let raw = include_str!("../../test-vectors/rewrite_file.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input_json = &case["input"];
        let content = input_json["content"].as_str().unwrap().as_bytes().to_vec();
        let mut input = FileRewrite::new(content.clone(), input_json["file_name"].as_str().unwrap());
        if let Some(t) = input_json["temperature"].as_f64() {
            input = input.temperature(t);
        }
        if let Some(kb) = input_json["use_knowledge_base"].as_bool() {
            input = input.use_knowledge_base(kb);
        }
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_submit_file(&input);
        assert_method_and_path(name, &req, expected_req);
        assert_eq!(req.headers, expected_headers(expected_req), "{name}: headers");
        assert!(req.body.as_json().is_none(), "{name}: file upload must not be JSON");

        let parts = req.body.parts().unwrap();
        let expected_parts = expected_req["parts"].as_array().unwrap();
        assert_eq!(parts.len(), expected_parts.len(), "{name}: part count");
        for (part, expected) in parts.iter().zip(expected_parts) {
            assert_eq!(part.name(), expected["name"].as_str().unwrap(), "{name}: part name");
            match part {
                FormPart::File {
                    file_name,
                    content_type,
                    bytes,
                    ..
                } => {
                    assert_eq!(file_name, expected["file_name"].as_str().unwrap(), "{name}: file name");
                    assert_eq!(content_type, expected["content_type"].as_str().unwrap(), "{name}: content type");
                    assert_eq!(bytes, &content, "{name}: file bytes");
                }
                FormPart::Text { value, .. } => {
                    assert_eq!(value, expected["value"].as_str().unwrap(), "{name}: part value");
                }
            }
        }

        // Verify parse
        let result = c.parse_rewrite(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, &result.unwrap_err(), expected_error);
        } else {
            let reply = result.unwrap().file_reply().unwrap();
            let expected: FileRewriteReply = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(reply, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[test]
fn health_test_vectors() {
    let raw = include_str!("../../test-vectors/health.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        // Verify build
        let req = c.build_health_probe();
        assert_method_and_path(name, &req, &case["expected_request"]);
        assert!(req.body.is_empty(), "{name}: body should be empty");

        // Verify parse
        let result = c.parse_health_probe(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_expected_error(name, &result.unwrap_err(), expected_error);
        } else {
            let status = result.unwrap();
            assert_eq!(status.is_alive(), case["expected_alive"].as_bool().unwrap(), "{name}: alive");
        }
    }
}

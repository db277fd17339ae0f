//! Verify request building and response dispatch against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each build vector describes the client state, the call, and the exact
//! request the transport must receive. Each dispatch vector describes a
//! simulated response and either the value delivered to the callback or the
//! error reported instead. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use serde_json::Value;
use xhr_core::{dispatch, ApiError, HttpMethod, HttpResponse, MultipartPart, RequestBody, XhrClient};

/// Decode the `body` field of a vector into a `RequestBody`.
fn parse_body(v: &Value) -> Option<RequestBody> {
    if v.is_null() {
        return None;
    }
    if let Some(json) = v.get("json") {
        return Some(RequestBody::Json(json.clone()));
    }
    if let Some(text) = v.get("text") {
        return Some(RequestBody::Text(text.as_str().unwrap().to_string()));
    }
    if let Some(form) = v.get("form") {
        let pairs = form
            .as_array()
            .unwrap()
            .iter()
            .map(|p| (p[0].as_str().unwrap(), p[1].as_str().unwrap()));
        return Some(RequestBody::form(pairs));
    }
    if let Some(multipart) = v.get("multipart") {
        let parts = multipart["parts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| MultipartPart {
                name: p["name"].as_str().unwrap().to_string(),
                filename: p["filename"].as_str().map(str::to_string),
                content_type: p["content_type"].as_str().map(str::to_string),
                data: p["data"].as_str().unwrap().to_string(),
            })
            .collect();
        return Some(RequestBody::Multipart {
            boundary: multipart["boundary"].as_str().unwrap().to_string(),
            parts,
        });
    }
    panic!("unknown body shape: {v}");
}

fn parse_headers(v: &Value) -> Vec<(String, String)> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn build_test_vectors() {
    let raw = include_str!("../../test-vectors/build.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let client = XhrClient::new(base_url).with_cookies(case["cookies"].as_str().unwrap());
        let method: HttpMethod = case["method"].as_str().unwrap().parse().unwrap();
        let body = parse_body(&case["body"]);
        let expected = &case["expected_request"];

        let req = client
            .build_request(method, case["target"].as_str().unwrap(), body.as_ref())
            .unwrap();

        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, parse_headers(&expected["headers"]), "{name}: headers");

        match (&req.body, &expected["body"]) {
            (None, Value::Null) => {}
            (Some(sent), exp) if exp.get("json").is_some() => {
                let sent: Value = serde_json::from_str(sent).unwrap();
                assert_eq!(&sent, &exp["json"], "{name}: json body");
            }
            (Some(sent), exp) => {
                assert_eq!(sent, exp["text"].as_str().unwrap(), "{name}: text body");
            }
            (None, exp) => panic!("{name}: expected body {exp}, got none"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_test_vectors() {
    let raw = include_str!("../../test-vectors/dispatch.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );

        let mut delivered = Vec::new();
        let result = dispatch(&response, |value| delivered.push(value));

        if let Some(expected_error) = case.get("expected_error") {
            assert!(delivered.is_empty(), "{name}: callback must not run");
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: {err}"),
                "HttpError" => assert!(matches!(err, ApiError::HttpError { .. }), "{name}: {err}"),
                "DeserializationError" => {
                    assert!(matches!(err, ApiError::DeserializationError(_)), "{name}: {err}")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            result.unwrap();
            assert_eq!(delivered, vec![case["expected_delivery"].clone()], "{name}: delivery");
        }
    }
}

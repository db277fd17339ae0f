//! C-ABI wrapper around `xhr-core`.
//!
//! # Overview
//! Exposes request building, CSRF token lookup and response dispatch through
//! `extern "C"` functions, so a host with its own HTTP stack (a webview
//! shell, a C program) can reuse the header and callback rules without
//! linking serde or a Rust HTTP client.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - The host executes the `FfiHttpRequest` and hands the status and body
//!   back through `FfiHttpResponse`.
//! - `xhr_dispatch` calls the C callback only for a 200 response with a JSON
//!   body; every other outcome comes back as an `FfiErrorCode`.
//! - The C caller owns all returned pointers and must call the matching
//!   `xhr_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::catch_unwind;

use xhr_core::{CookieJar, HttpResponse, RequestBody};

use types::*;

/// Callback invoked by `xhr_dispatch` with the decoded body as JSON text.
/// The string is only valid for the duration of the call.
pub type XhrCallback = Option<unsafe extern "C" fn(json: *const c_char, user_data: *mut c_void)>;

/// Borrow a C string as `&str`. Invalid UTF-8 reads as empty.
unsafe fn c_str<'a>(ptr: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `XhrClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `xhr_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_client_new(base_url: *const c_char) -> *mut FfiXhrClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = unsafe { c_str(base_url) };
        let client = xhr_core::XhrClient::new(url);
        Box::into_raw(Box::new(FfiXhrClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an `XhrClient` created by `xhr_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_client_free(client: *mut FfiXhrClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Replace the client's cookies with those parsed from a `Cookie`-style
/// header (`document.cookie` format).
///
/// Returns false if either argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_client_set_cookies(client: *mut FfiXhrClient, cookie_header: *const c_char) -> bool {
    catch_unwind(|| {
        if client.is_null() || cookie_header.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        let header = unsafe { c_str(cookie_header) };
        *client.inner.cookies_mut() = CookieJar::parse(header);
        true
    })
    .unwrap_or(false)
}

/// Apply one `Set-Cookie` response header to the client's cookies.
///
/// Returns false if either argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_client_absorb_set_cookie(client: *mut FfiXhrClient, set_cookie: *const c_char) -> bool {
    catch_unwind(|| {
        if client.is_null() || set_cookie.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        let header = unsafe { c_str(set_cookie) };
        client.inner.cookies_mut().apply_set_cookie(header);
        true
    })
    .unwrap_or(false)
}

/// The anti-forgery token the next request would carry.
///
/// Returns null if `client` is null or no token cookie is set. Free a
/// non-null result with `xhr_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_client_csrf_token(client: *const FfiXhrClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.csrf_token() {
            Some(token) => into_c_string(token.to_string()),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Build a request for `method` against `target` (absolute, or relative to
/// the client's base URL).
///
/// `body` may be null. With `FfiBodyKind::Json` it must hold valid JSON.
/// Returns null if `client` or `target` is null, or if the body does not
/// parse. The caller must free the returned pointer with `xhr_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_build_request(
    client: *const FfiXhrClient,
    method: FfiHttpMethod,
    target: *const c_char,
    body: *const c_char,
    body_kind: FfiBodyKind,
    synchronous: bool,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() || target.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let target = unsafe { c_str(target) };
        let body = if body.is_null() {
            None
        } else {
            let raw = unsafe { c_str(body) };
            match body_kind {
                FfiBodyKind::Text => Some(RequestBody::from(raw)),
                FfiBodyKind::Json => match serde_json::from_str(raw) {
                    Ok(value) => Some(RequestBody::Json(value)),
                    Err(_) => return std::ptr::null_mut(),
                },
            }
        };
        match client.inner.build_request(method.into(), target, body.as_ref()) {
            Ok(mut req) => {
                req.synchronous = synchronous;
                FfiHttpRequest::from_core(req)
            }
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse and dispatch
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() {
        String::new()
    } else {
        unsafe { c_str(resp.body) }.to_string()
    };
    HttpResponse::new(resp.status, body)
}

/// Decode a 200 response into JSON text.
///
/// Any other status yields an error result; 404 maps to `NotFound`.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_parse_response(
    client: *const FfiXhrClient,
    response: *const FfiHttpResponse,
) -> *mut FfiXhrResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiXhrResult::null_arg("client");
        }
        if response.is_null() {
            return FfiXhrResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        match client.inner.parse_value(&resp) {
            Ok(value) => FfiXhrResult::ok_json(&value, resp.status),
            Err(e) => FfiXhrResult::from_error(e, resp.status),
        }
    })
    .unwrap_or_else(|_| FfiXhrResult::panic("panic in xhr_parse_response"))
}

/// Hand a completed response to `callback`.
///
/// The callback runs exactly once, with the body re-serialized as JSON,
/// when the status is 200 and the body parses. Otherwise it is not called
/// and the returned code says why. Needs no client: dispatch depends on the
/// response alone.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_dispatch(
    response: *const FfiHttpResponse,
    callback: XhrCallback,
    user_data: *mut c_void,
) -> FfiErrorCode {
    catch_unwind(|| {
        if response.is_null() {
            return FfiErrorCode::NullArg;
        }
        let Some(callback) = callback else {
            return FfiErrorCode::NullArg;
        };
        let resp = ffi_response_to_core(unsafe { &*response });
        let outcome = xhr_core::dispatch(&resp, |value| {
            let json = CString::new(value.to_string()).unwrap_or_default();
            unsafe { callback(json.as_ptr(), user_data) };
        });
        match outcome {
            Ok(()) => FfiErrorCode::Ok,
            Err(e) => FfiErrorCode::from(&e),
        }
    })
    .unwrap_or(FfiErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `xhr_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Vec::from_raw_parts(req.headers, req.headers_len as usize, req.headers_len as usize)
            };
            for h in headers {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiXhrResult` returned by `xhr_parse_response`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_free_result(result: *mut FfiXhrResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.json.is_null() {
            drop(unsafe { CString::from_raw(result.json) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn xhr_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(base: &str) -> *mut FfiXhrClient {
        let url = CString::new(base).unwrap();
        xhr_client_new(url.as_ptr())
    }

    fn set_cookies(client: *mut FfiXhrClient, header: &str) {
        let header = CString::new(header).unwrap();
        assert!(xhr_client_set_cookies(client, header.as_ptr()));
    }

    fn headers(req: &FfiHttpRequest) -> Vec<(String, String)> {
        let raw = unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) };
        raw.iter()
            .map(|h| unsafe {
                (
                    CStr::from_ptr(h.key).to_str().unwrap().to_string(),
                    CStr::from_ptr(h.value).to_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    unsafe extern "C" fn collect(json: *const c_char, user_data: *mut c_void) {
        let sink = unsafe { &mut *(user_data as *mut Vec<String>) };
        sink.push(unsafe { CStr::from_ptr(json) }.to_str().unwrap().to_string());
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client("http://localhost:8000");
        assert!(!client.is_null());
        xhr_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        assert!(xhr_client_new(std::ptr::null()).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        xhr_client_free(std::ptr::null_mut());
    }

    #[test]
    fn csrf_token_follows_cookies() {
        let client = new_client("http://localhost:8000");
        assert!(xhr_client_csrf_token(client).is_null());

        set_cookies(client, "sessionid=s1; csrftoken=abc123");
        let token = xhr_client_csrf_token(client);
        assert_eq!(unsafe { CStr::from_ptr(token) }.to_str().unwrap(), "abc123");
        xhr_free_string(token);

        let expire = CString::new("csrftoken=; Max-Age=0").unwrap();
        assert!(xhr_client_absorb_set_cookie(client, expire.as_ptr()));
        assert!(xhr_client_csrf_token(client).is_null());

        xhr_client_free(client);
    }

    #[test]
    fn build_get_carries_csrf_headers() {
        let client = new_client("");
        set_cookies(client, "csrftoken=abc123");
        let target = CString::new("/api/items").unwrap();
        let req = xhr_build_request(
            client,
            FfiHttpMethod::Get,
            target.as_ptr(),
            std::ptr::null(),
            FfiBodyKind::Text,
            true,
        );
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Get);
        assert_eq!(unsafe { CStr::from_ptr(req_ref.url) }.to_str().unwrap(), "/api/items");
        assert!(req_ref.body.is_null());
        assert!(req_ref.synchronous);
        assert_eq!(
            headers(req_ref),
            vec![
                ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
                ("X-CSRFToken".to_string(), "abc123".to_string()),
            ]
        );

        xhr_free_request(req);
        xhr_client_free(client);
    }

    #[test]
    fn build_post_with_json_body() {
        let client = new_client("http://localhost:8000");
        let target = CString::new("/api/items").unwrap();
        let body = CString::new(r#"{"name":"pot"}"#).unwrap();
        let req = xhr_build_request(
            client,
            FfiHttpMethod::Post,
            target.as_ptr(),
            body.as_ptr(),
            FfiBodyKind::Json,
            false,
        );
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.method, FfiHttpMethod::Post);
        assert!(!req_ref.synchronous);
        assert!(headers(req_ref).contains(&("content-type".to_string(), "application/json".to_string())));
        let sent = unsafe { CStr::from_ptr(req_ref.body) }.to_str().unwrap();
        let sent: serde_json::Value = serde_json::from_str(sent).unwrap();
        assert_eq!(sent["name"], "pot");

        xhr_free_request(req);
        xhr_client_free(client);
    }

    #[test]
    fn build_with_invalid_json_body_returns_null() {
        let client = new_client("http://localhost:8000");
        let target = CString::new("/api/items").unwrap();
        let body = CString::new("{not json").unwrap();
        let req = xhr_build_request(
            client,
            FfiHttpMethod::Post,
            target.as_ptr(),
            body.as_ptr(),
            FfiBodyKind::Json,
            false,
        );
        assert!(req.is_null());
        xhr_client_free(client);
    }

    #[test]
    fn build_null_client_returns_null() {
        let target = CString::new("/api/items").unwrap();
        let req = xhr_build_request(
            std::ptr::null(),
            FfiHttpMethod::Get,
            target.as_ptr(),
            std::ptr::null(),
            FfiBodyKind::Text,
            false,
        );
        assert!(req.is_null());
    }

    #[test]
    fn parse_response_success() {
        let client = new_client("http://localhost:8000");
        let body = CString::new(r#"{"items": []}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let result = xhr_parse_response(client, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert_eq!(r.http_status, 200);
        assert_eq!(unsafe { CStr::from_ptr(r.json) }.to_str().unwrap(), r#"{"items":[]}"#);

        xhr_free_result(result);
        xhr_client_free(client);
    }

    #[test]
    fn parse_response_not_found() {
        let client = new_client("http://localhost:8000");
        let resp = FfiHttpResponse {
            status: 404,
            body: std::ptr::null(),
        };
        let result = xhr_parse_response(client, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NotFound);
        assert!(!r.error_message.is_null());
        assert!(r.json.is_null());

        xhr_free_result(result);
        xhr_client_free(client);
    }

    #[test]
    fn parse_null_response_returns_null_arg() {
        let client = new_client("http://localhost:8000");
        let result = xhr_parse_response(client, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        xhr_free_result(result);
        xhr_client_free(client);
    }

    #[test]
    fn dispatch_calls_back_once_on_200() {
        let body = CString::new(r#"{"items": []}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        let mut seen: Vec<String> = Vec::new();
        let code = xhr_dispatch(&resp, Some(collect), &mut seen as *mut _ as *mut c_void);
        assert_eq!(code, FfiErrorCode::Ok);
        assert_eq!(seen, vec![r#"{"items":[]}"#.to_string()]);
    }

    #[test]
    fn dispatch_skips_callback_otherwise() {
        let cases = [
            (403, r#"{"detail":"CSRF Failed"}"#, FfiErrorCode::Http),
            (404, "", FfiErrorCode::NotFound),
            (201, "{}", FfiErrorCode::Http),
            (200, "<html>", FfiErrorCode::Deserialization),
        ];
        for (status, text, expected) in cases {
            let body = CString::new(text).unwrap();
            let resp = FfiHttpResponse {
                status,
                body: body.as_ptr(),
            };
            let mut seen: Vec<String> = Vec::new();
            let code = xhr_dispatch(&resp, Some(collect), &mut seen as *mut _ as *mut c_void);
            assert_eq!(code, expected, "status {status}");
            assert!(seen.is_empty(), "status {status} reached the callback");
        }
    }

    #[test]
    fn dispatch_without_callback_or_response_returns_null_arg() {
        let resp = FfiHttpResponse {
            status: 200,
            body: std::ptr::null(),
        };
        let code = xhr_dispatch(&resp, None, std::ptr::null_mut());
        assert_eq!(code, FfiErrorCode::NullArg);

        let code = xhr_dispatch(std::ptr::null(), Some(collect), std::ptr::null_mut());
        assert_eq!(code, FfiErrorCode::NullArg);
    }

    #[test]
    fn header_is_generated_outside_the_source_tree() {
        let Some(path) = option_env!("XHR_FFI_HEADER") else {
            return;
        };
        let path = std::path::Path::new(path);
        assert!(!path.starts_with(env!("CARGO_MANIFEST_DIR")), "{}", path.display());
        let header = std::fs::read_to_string(path).unwrap();
        assert!(header.contains("xhr_dispatch"));
    }

    #[test]
    fn free_request_null_is_safe() {
        xhr_free_request(std::ptr::null_mut());
    }

    #[test]
    fn free_result_null_is_safe() {
        xhr_free_result(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        xhr_free_string(std::ptr::null_mut());
    }
}

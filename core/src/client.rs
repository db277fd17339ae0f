//! Request issuer: builds requests, attaches credentials, and runs exchanges.
//!
//! # Design
//! `XhrClient` holds a base URL, a cookie jar, and the CSRF policy. Building
//! a request never performs I/O: `build_*` methods produce an `HttpRequest`
//! and `parse_*` methods consume an `HttpResponse`. `send` ties the two
//! together over a caller-supplied `Transport` and hands the decoded body to
//! a callback, either on the calling thread or on a background worker.

use tracing::debug;
use url::Url;

use crate::body::{MultipartPart, RequestBody};
use crate::credentials::{CookieJar, CsrfPolicy};
use crate::dispatch::{self, RequestHandle};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Header that marks a request as issued by client script.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// Client-side request wrapper.
#[derive(Debug, Clone)]
pub struct XhrClient {
    base_url: String,
    cookies: CookieJar,
    csrf: CsrfPolicy,
    default_headers: Vec<(String, String)>,
    send_cookies: bool,
}

impl XhrClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies: CookieJar::new(),
            csrf: CsrfPolicy::default(),
            default_headers: Vec::new(),
            send_cookies: false,
        }
    }

    /// Seed the cookie jar from a `Cookie` header string.
    pub fn with_cookies(mut self, header: &str) -> Self {
        self.cookies = CookieJar::parse(header);
        self
    }

    pub fn with_csrf_policy(mut self, policy: CsrfPolicy) -> Self {
        self.csrf = policy;
        self
    }

    /// Header sent with every request, after `X-Requested-With`.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Send the jar as a `Cookie` header. Browser hosts attach cookies
    /// themselves and leave this off.
    pub fn with_cookie_header(mut self) -> Self {
        self.send_cookies = true;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn csrf_policy(&self) -> &CsrfPolicy {
        &self.csrf
    }

    /// The anti-forgery token that would be attached right now.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf.token(&self.cookies)
    }

    /// Absolute hierarchical targets (`scheme://...`) pass through; anything
    /// else, including `word:rest` shapes, is joined onto the base URL.
    pub fn resolve(&self, target: &str) -> String {
        if Url::parse(target).is_ok_and(|u| !u.cannot_be_a_base()) {
            return target.to_string();
        }
        format!("{}/{}", self.base_url, target.trim_start_matches('/'))
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        target: &str,
        body: Option<&RequestBody>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.resolve(target);
        let mut headers = vec![(REQUESTED_WITH_HEADER.to_string(), REQUESTED_WITH_VALUE.to_string())];
        headers.extend(self.default_headers.iter().cloned());
        if let Some(token) = self.csrf_token() {
            headers.push((self.csrf.header_name.clone(), token.to_string()));
        }
        if self.send_cookies {
            if let Some(cookie) = self.cookies.header_value() {
                headers.push(("Cookie".to_string(), cookie));
            }
        }
        let body = match body {
            Some(b) => {
                if let Some(content_type) = b.content_type() {
                    headers.push(("content-type".to_string(), content_type.into_owned()));
                }
                Some(b.encode()?)
            }
            None => None,
        };
        debug!(%method, %url, csrf = self.csrf_token().is_some(), "built request");
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            synchronous: false,
        })
    }

    /// GET with `query` pairs appended to any query already on the target.
    pub fn build_get(&self, target: &str, query: &[(&str, &str)]) -> Result<HttpRequest, ApiError> {
        let mut req = self.build_request(HttpMethod::Get, target, None)?;
        if !query.is_empty() {
            req.url = append_query(&req.url, query)?;
        }
        Ok(req)
    }

    pub fn build_post(&self, target: &str, body: Option<&RequestBody>) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, target, body)
    }

    pub fn build_put(&self, target: &str, body: Option<&RequestBody>) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Put, target, body)
    }

    pub fn build_patch(&self, target: &str, body: Option<&RequestBody>) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Patch, target, body)
    }

    pub fn build_delete(&self, target: &str, body: Option<&RequestBody>) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Delete, target, body)
    }

    /// POST `parts` as `multipart/form-data`.
    pub fn build_upload(
        &self,
        target: &str,
        parts: impl IntoIterator<Item = MultipartPart>,
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, target, Some(&RequestBody::multipart(parts)))
    }

    pub fn parse_json<T: serde::de::DeserializeOwned>(&self, response: &HttpResponse) -> Result<T, ApiError> {
        dispatch::decode(response)
    }

    pub fn parse_value(&self, response: &HttpResponse) -> Result<serde_json::Value, ApiError> {
        dispatch::decode(response)
    }

    /// Accept an empty success (200 or 204) without decoding the body.
    pub fn parse_no_content(&self, response: &HttpResponse) -> Result<(), ApiError> {
        if response.status == 204 {
            return Ok(());
        }
        dispatch::check_status(response, 200)
    }

    /// Apply every `Set-Cookie` header of `response` to the jar.
    pub fn absorb_cookies(&mut self, response: &HttpResponse) {
        for header in response.header_values("set-cookie") {
            self.cookies.apply_set_cookie(header);
        }
    }

    /// Issue a request and deliver the decoded 200 body to `callback`.
    ///
    /// With `synchronous` set, the exchange and the callback run on the
    /// calling thread and the returned handle is already complete. Otherwise
    /// both run on a worker thread and the handle completes later. Build
    /// failures are returned immediately; transport and status failures are
    /// reported through the handle.
    pub fn send<T, F>(
        &self,
        transport: T,
        method: HttpMethod,
        target: &str,
        callback: F,
        synchronous: bool,
        body: Option<RequestBody>,
    ) -> Result<RequestHandle, ApiError>
    where
        T: Transport + 'static,
        F: FnOnce(serde_json::Value) + Send + 'static,
    {
        let mut request = self.build_request(method, target, body.as_ref())?;
        request.synchronous = synchronous;

        if synchronous {
            return Ok(RequestHandle::completed(exchange(&transport, &request, callback)));
        }
        Ok(RequestHandle::spawn(move || exchange(&transport, &request, callback)))
    }

    /// Upload one file part, usually built with `MultipartPart::upload`.
    ///
    /// With a callback the exchange runs in the background and the callback
    /// gets the decoded 200 body. Without one the call blocks until the
    /// exchange is done and the returned handle is already complete.
    pub fn upload<T, F>(
        &self,
        transport: T,
        target: &str,
        file: MultipartPart,
        callback: Option<F>,
    ) -> Result<RequestHandle, ApiError>
    where
        T: Transport + 'static,
        F: FnOnce(serde_json::Value) + Send + 'static,
    {
        let body = RequestBody::multipart([file]);
        match callback {
            Some(callback) => self.send(transport, HttpMethod::Post, target, callback, false, Some(body)),
            None => self.send(transport, HttpMethod::Post, target, |_| {}, true, Some(body)),
        }
    }
}

fn exchange<T, F>(transport: &T, request: &HttpRequest, callback: F) -> Result<(), ApiError>
where
    T: Transport,
    F: FnOnce(serde_json::Value),
{
    let response = transport.execute(request)?;
    dispatch::dispatch(&response, callback)
}

fn append_query(url: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().extend_pairs(query);
            Ok(parsed.to_string())
        }
        // Relative URL: encode the pairs by hand against the same serializer.
        // The query goes before any fragment.
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            let (path, fragment) = match url.split_once('#') {
                Some((path, fragment)) => (path, Some(fragment)),
                None => (url, None),
            };
            let sep = if path.contains('?') { '&' } else { '?' };
            Ok(match fragment {
                Some(fragment) => format!("{path}{sep}{encoded}#{fragment}"),
                None => format!("{path}{sep}{encoded}"),
            })
        }
        Err(e) => Err(ApiError::InvalidUrl(format!("{url}: {e}"))),
    }
}

//! Client-side request wrapper with anti-forgery token attachment.
//!
//! # Overview
//! Builds `HttpRequest` values, reads the CSRF token out of a cookie jar,
//! and dispatches `HttpResponse` values to callbacks without touching the
//! network (host-does-IO pattern). A `Transport` supplied by the caller
//! executes the actual HTTP round-trip.
//!
//! # Design
//! - `XhrClient` holds the base URL, the cookie jar, and the `CsrfPolicy`.
//! - Every request carries `X-Requested-With: XMLHttpRequest` and, when the
//!   token cookie is present, the token header.
//! - A 200 response is decoded as JSON and handed to the callback once. Any
//!   other outcome skips the callback and is reported as an `ApiError`
//!   through the `RequestHandle`.
//! - Types use owned `String` / `Vec` fields so they can cross the FFI and
//!   thread boundaries.

pub mod body;
pub mod client;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod transport;

pub use body::{MultipartPart, RequestBody};
pub use client::XhrClient;
pub use credentials::{CookieJar, CsrfPolicy};
pub use dispatch::{dispatch, RequestHandle, RequestState};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportError};

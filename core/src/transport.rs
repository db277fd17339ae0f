//! The I/O seam.
//!
//! The core never opens a connection. Whatever executes requests (a blocking
//! HTTP agent, a browser shell behind FFI, a test double) implements
//! `Transport` and is handed to `XhrClient::send`.

use std::sync::Arc;

use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};

/// Failure reported by a transport before any response was produced.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes one HTTP exchange.
///
/// Implementations must return non-2xx statuses as `Ok` responses; only
/// failures that prevent a response (connection refused, broken stream)
/// are errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

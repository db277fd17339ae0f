//! Error types for the request wrapper.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-200 responses land in `HttpError` with the raw
//! status code and body for debugging. A non-200 response never reaches the
//! success callback; it is reported here instead.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned while building, executing, or dispatching a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than 200 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be decoded as JSON.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// The transport failed before a response was produced.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A background exchange ended without reporting an outcome.
    #[error("request worker disconnected")]
    Disconnected,
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Transport(err.to_string())
    }
}

//! Request payloads.
//!
//! A body is either sent verbatim, serialized as JSON, form-encoded, or
//! written as `multipart/form-data` for uploads. The variant decides the
//! `content-type` header the issuer attaches.

use std::borrow::Cow;

use serde::Serialize;
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::ApiError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Field name an upload stores its file under.
pub const UPLOAD_FIELD: &str = "file";

/// One field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: String,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into(),
        }
    }

    /// A file field. `content_type` defaults to `application/octet-stream`
    /// when the part is written.
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }

    /// A file stored under `UPLOAD_FIELD`.
    pub fn upload(filename: impl Into<String>, content_type: Option<&str>, data: impl Into<String>) -> Self {
        Self::file(UPLOAD_FIELD, filename, content_type, data)
    }

    fn write_to(&self, boundary: &str, out: &mut String) {
        out.push_str("--");
        out.push_str(boundary);
        out.push_str("\r\nContent-Disposition: form-data; name=\"");
        out.push_str(&escape_quoted(&self.name));
        out.push('"');
        if let Some(filename) = &self.filename {
            out.push_str("; filename=\"");
            out.push_str(&escape_quoted(filename));
            out.push('"');
            let content_type = self.content_type.as_deref().unwrap_or("application/octet-stream");
            out.push_str("\r\nContent-Type: ");
            out.push_str(content_type);
        } else if let Some(content_type) = &self.content_type {
            out.push_str("\r\nContent-Type: ");
            out.push_str(content_type);
        }
        out.push_str("\r\n\r\n");
        out.push_str(&self.data);
        out.push_str("\r\n");
    }
}

/// Quoted header parameters escape `"`, CR and LF the way browsers do.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Payload of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as-is with no content type.
    Text(String),
    Json(serde_json::Value),
    /// Key/value pairs, encoded in order.
    Form(Vec<(String, String)>),
    Multipart {
        boundary: String,
        parts: Vec<MultipartPart>,
    },
}

impl RequestBody {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Multipart body with a fresh random boundary.
    pub fn multipart(parts: impl IntoIterator<Item = MultipartPart>) -> Self {
        RequestBody::Multipart {
            boundary: format!("----xhr{}", Uuid::new_v4().simple()),
            parts: parts.into_iter().collect(),
        }
    }

    pub fn content_type(&self) -> Option<Cow<'static, str>> {
        match self {
            RequestBody::Text(_) => None,
            RequestBody::Json(_) => Some(Cow::Borrowed(CONTENT_TYPE_JSON)),
            RequestBody::Form(_) => Some(Cow::Borrowed(CONTENT_TYPE_FORM)),
            RequestBody::Multipart { boundary, .. } => {
                Some(Cow::Owned(format!("{CONTENT_TYPE_MULTIPART}; boundary={boundary}")))
            }
        }
    }

    /// The wire form of the body.
    pub fn encode(&self) -> Result<String, ApiError> {
        match self {
            RequestBody::Text(text) => Ok(text.clone()),
            RequestBody::Json(value) => {
                serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))
            }
            RequestBody::Form(pairs) => Ok(form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish()),
            RequestBody::Multipart { boundary, parts } => {
                let mut out = String::new();
                for part in parts {
                    part.write_to(boundary, &mut out);
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
                Ok(out)
            }
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `build_*` / `parse_*` methods on `RewriteClient` produce and consume them
//! without touching the network; `transport` is the only module that turns
//! them into real round-trips.
//!
//! The request body is a tagged value because the two rewrite operations use
//! genuinely different wire encodings: JSON for inline text, multipart for
//! file uploads. Multipart bodies stay as a list of parts here; the boundary
//! and the final `content-type` header are chosen by the transport.

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// A plain text field.
    Text { name: String, value: String },
    /// A binary field carrying a file name and content type.
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Request body, one variant per wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(String),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// The JSON text, if this is a JSON body.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(body) => Some(body),
            _ => None,
        }
    }

    /// The form parts, if this is a multipart body.
    pub fn parts(&self) -> Option<&[FormPart]> {
        match self {
            RequestBody::Multipart(parts) => Some(parts),
            _ => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: the client's base URL joined with the operation path.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Produced by the transport after a round-trip, or by hand in tests, then
/// passed to `RewriteClient::parse_*`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//! Request payloads and reply types for the rewriting service.
//!
//! # Design
//! The two payloads are separate types because they travel with different
//! encodings. Generation parameters are forwarded as-is: the service owns
//! any range checks on `temperature` and any emptiness check on `text`.
//!
//! Replies are kept opaque (`RewriteResult` wraps the decoded JSON). The
//! typed reply structs describe what the reference service sends and are
//! opt-in views; a reply that decodes as JSON is a success even if it does
//! not match them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RewriteError;

pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_USE_KNOWLEDGE_BASE: bool = true;

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_use_knowledge_base() -> bool {
    DEFAULT_USE_KNOWLEDGE_BASE
}

/// Inline text to rewrite. Serialized verbatim as the JSON request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRewrite {
    pub text: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_use_knowledge_base")]
    pub use_knowledge_base: bool,
}

impl TextRewrite {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            temperature: DEFAULT_TEMPERATURE,
            use_knowledge_base: DEFAULT_USE_KNOWLEDGE_BASE,
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn use_knowledge_base(mut self, enabled: bool) -> Self {
        self.use_knowledge_base = enabled;
        self
    }
}

/// A document to rewrite, uploaded as multipart form data.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRewrite {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub temperature: f64,
    pub use_knowledge_base: bool,
}

impl FileRewrite {
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            temperature: DEFAULT_TEMPERATURE,
            use_knowledge_base: DEFAULT_USE_KNOWLEDGE_BASE,
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn use_knowledge_base(mut self, enabled: bool) -> Self {
        self.use_knowledge_base = enabled;
        self
    }

    /// Content type of the file part, from the file extension.
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => "application/pdf",
            Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Some("txt") => "text/plain",
            Some("md") => "text/markdown",
            _ => "application/octet-stream",
        }
    }
}

/// Decoded reply of a rewrite call. The client requires only well-formed JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteResult(serde_json::Value);

impl RewriteResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Decode the reply into a caller-chosen shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RewriteError> {
        T::deserialize(&self.0).map_err(|e| RewriteError::Decode(e.to_string()))
    }

    /// View the reply as the reference service's text rewrite reply.
    pub fn text_reply(&self) -> Result<TextRewriteReply, RewriteError> {
        self.decode()
    }

    /// View the reply as the reference service's file rewrite reply.
    pub fn file_reply(&self) -> Result<FileRewriteReply, RewriteError> {
        self.decode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRewriteReply {
    pub success: bool,
    pub original_text: String,
    pub rewritten_text: String,
    pub original_length: usize,
    pub rewritten_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenSegment {
    pub index: usize,
    /// Source page, only reported for paginated documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub original: String,
    pub rewritten: String,
    pub original_length: usize,
    pub rewritten_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStatistics {
    pub total_original_length: usize,
    pub total_rewritten_length: usize,
    pub length_change: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRewriteReply {
    pub success: bool,
    pub filename: String,
    pub file_type: String,
    pub segments: Vec<RewrittenSegment>,
    pub total_segments: usize,
    pub statistics: RewriteStatistics,
}

/// Body of a health-check reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Outcome of a health probe that got a decodable 2xx reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Alive(HealthReport),
    NotAlive(HealthReport),
}

impl ServiceStatus {
    pub fn from_report(report: HealthReport) -> Self {
        if report.status == "ok" {
            ServiceStatus::Alive(report)
        } else {
            ServiceStatus::NotAlive(report)
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self, ServiceStatus::Alive(_))
    }

    pub fn report(&self) -> &HealthReport {
        match self {
            ServiceStatus::Alive(report) | ServiceStatus::NotAlive(report) => report,
        }
    }
}

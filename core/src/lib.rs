//! Async client core for a remote text-rewriting service.
//!
//! # Overview
//! Submits inline text (JSON) or a document (multipart upload) for rewriting,
//! probes service health, and normalizes every outcome into either a decoded
//! reply or a classified `RewriteError`.
//!
//! # Design
//! - `RewriteClient` is stateless: it holds an immutable `ServiceEndpoint`
//!   and a pooled HTTP client, and can be shared by concurrent callers.
//! - Each operation is split into `build_*` (produces a plain-data request)
//!   and `parse_*` (consumes a plain-data response), so the I/O boundary is
//!   explicit and the wire contract is testable without a network.
//! - Every call is one-shot and raced against the endpoint timeout and an
//!   optional `CancelHandle`; whichever resolves first wins.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod call;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use call::{CallState, CancelHandle};
pub use client::RewriteClient;
pub use config::ServiceEndpoint;
pub use error::RewriteError;
pub use http::{FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use types::{
    FileRewrite, FileRewriteReply, HealthReport, RewriteResult, RewriteStatistics, RewrittenSegment,
    ServiceStatus, TextRewrite, TextRewriteReply,
};

//! Request orchestration for the rewriting service.
//!
//! # Design
//! `RewriteClient` holds only its `ServiceEndpoint` and a pooled reqwest
//! client; it carries no mutable state between calls and can be cloned and
//! shared by concurrent callers. Each operation is split into a pure
//! `build_*` method that produces an `HttpRequest` and a pure `parse_*`
//! method that consumes an `HttpResponse`. The async methods glue them
//! together with one transport round-trip raced against the endpoint's
//! timeout and an optional cancel handle.
//!
//! Calls are one-shot. Nothing is retried: a rewrite may cost money or have
//! side effects server-side, so resubmitting is the caller's decision.

use std::time::Instant;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::call::{race, CallState, CancelHandle};
use crate::config::ServiceEndpoint;
use crate::error::RewriteError;
use crate::http::{FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::transport;
use crate::types::{FileRewrite, HealthReport, RewriteResult, ServiceStatus, TextRewrite};

pub const REWRITE_TEXT_PATH: &str = "/api/rewrite";
pub const REWRITE_FILE_PATH: &str = "/api/rewrite-file";
pub const HEALTH_PATH: &str = "/api/health";

/// Async client for the rewriting service.
#[derive(Debug, Clone)]
pub struct RewriteClient {
    endpoint: ServiceEndpoint,
    http: reqwest::Client,
}

impl RewriteClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, RewriteError> {
        Ok(Self::with_http_client(endpoint, transport::build_http_client()?))
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, pooling).
    pub fn with_http_client(endpoint: ServiceEndpoint, http: reqwest::Client) -> Self {
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn submit_text(&self, request: &TextRewrite) -> Result<RewriteResult, RewriteError> {
        self.submit_text_with(request, &CancelHandle::new()).await
    }

    pub async fn submit_text_with(
        &self,
        request: &TextRewrite,
        cancel: &CancelHandle,
    ) -> Result<RewriteResult, RewriteError> {
        let req = self.build_submit_text(request)?;
        let response = self.dispatch("submit_text", &req, cancel).await?;
        self.parse_rewrite(response)
    }

    pub async fn submit_file(&self, request: &FileRewrite) -> Result<RewriteResult, RewriteError> {
        self.submit_file_with(request, &CancelHandle::new()).await
    }

    pub async fn submit_file_with(
        &self,
        request: &FileRewrite,
        cancel: &CancelHandle,
    ) -> Result<RewriteResult, RewriteError> {
        let req = self.build_submit_file(request);
        let response = self.dispatch("submit_file", &req, cancel).await?;
        self.parse_rewrite(response)
    }

    pub async fn health_probe(&self) -> Result<ServiceStatus, RewriteError> {
        self.health_probe_with(&CancelHandle::new()).await
    }

    pub async fn health_probe_with(&self, cancel: &CancelHandle) -> Result<ServiceStatus, RewriteError> {
        let req = self.build_health_probe();
        let response = self.dispatch("health_probe", &req, cancel).await?;
        self.parse_health_probe(response)
    }

    /// One round-trip for `req`, resolved by whichever comes first: the
    /// reply, the endpoint timeout, or `cancel`.
    async fn dispatch(
        &self,
        operation: &'static str,
        req: &HttpRequest,
        cancel: &CancelHandle,
    ) -> Result<HttpResponse, RewriteError> {
        let call_id = Uuid::new_v4();
        let span = info_span!("rewrite_call", %call_id, operation, url = %req.url);

        async {
            let started = Instant::now();
            debug!(method = req.method.as_str(), "dispatching request");

            let result = race(
                transport::execute(&self.http, req, call_id),
                self.endpoint.timeout(),
                cancel,
            )
            .await;

            let elapsed = started.elapsed();
            match &result {
                Ok(response) if response.is_success() => {
                    info!(status = response.status, ?elapsed, "reply received");
                }
                Ok(response) => {
                    warn!(status = response.status, ?elapsed, "service rejected request");
                }
                Err(e) => {
                    warn!(state = ?CallState::of(&result), ?elapsed, error = %e, "call failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_submit_text(&self, request: &TextRewrite) -> Result<HttpRequest, RewriteError> {
        let body = serde_json::to_string(request).map_err(|e| RewriteError::InvalidRequest(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.endpoint.url(REWRITE_TEXT_PATH),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: RequestBody::Json(body),
        })
    }

    /// Multipart carries no types, so the parameters go out as their text
    /// form (`0.5`, `true`).
    pub fn build_submit_file(&self, request: &FileRewrite) -> HttpRequest {
        let parts = vec![
            FormPart::File {
                name: "file".to_string(),
                file_name: request.file_name.clone(),
                content_type: request.content_type().to_string(),
                bytes: request.bytes.clone(),
            },
            FormPart::Text {
                name: "temperature".to_string(),
                value: request.temperature.to_string(),
            },
            FormPart::Text {
                name: "use_knowledge_base".to_string(),
                value: request.use_knowledge_base.to_string(),
            },
        ];
        HttpRequest {
            method: HttpMethod::Post,
            url: self.endpoint.url(REWRITE_FILE_PATH),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: RequestBody::Multipart(parts),
        }
    }

    pub fn build_health_probe(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.endpoint.url(HEALTH_PATH),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: RequestBody::Empty,
        }
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    /// Parse the reply of either rewrite operation.
    pub fn parse_rewrite(&self, response: HttpResponse) -> Result<RewriteResult, RewriteError> {
        let value = decode_success(response)?;
        Ok(RewriteResult::new(value))
    }

    pub fn parse_health_probe(&self, response: HttpResponse) -> Result<ServiceStatus, RewriteError> {
        let value = decode_success(response)?;
        let report: HealthReport =
            serde_json::from_value(value).map_err(|e| RewriteError::Decode(e.to_string()))?;
        Ok(ServiceStatus::from_report(report))
    }
}

/// Reject non-2xx replies, then decode the body as JSON.
fn decode_success(response: HttpResponse) -> Result<serde_json::Value, RewriteError> {
    if !response.is_success() {
        return Err(RewriteError::Service {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| RewriteError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client() -> RewriteClient {
        RewriteClient::new(ServiceEndpoint::new("http://localhost:5000", Duration::from_secs(5))).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_submit_text_produces_json_request() {
        let req = client().build_submit_text(&TextRewrite::new("Some paragraph.")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:5000/api/rewrite");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_json().unwrap()).unwrap();
        assert_eq!(body["text"], "Some paragraph.");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["use_knowledge_base"], true);
    }

    #[test]
    fn build_submit_text_forwards_empty_text() {
        let req = client().build_submit_text(&TextRewrite::new("")).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_json().unwrap()).unwrap();
        assert_eq!(body["text"], "");
    }

    #[test]
    fn build_submit_file_produces_multipart_request() {
        let input = FileRewrite::new(b"para one\n\npara two".to_vec(), "draft.txt")
            .temperature(0.8)
            .use_knowledge_base(false);
        let req = client().build_submit_file(&input);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:5000/api/rewrite-file");
        assert!(req.body.as_json().is_none());
        assert_eq!(req.header("content-type"), None);

        let parts = req.body.parts().unwrap();
        let names: Vec<&str> = parts.iter().map(FormPart::name).collect();
        assert_eq!(names, ["file", "temperature", "use_knowledge_base"]);
        assert_eq!(
            parts[0],
            FormPart::File {
                name: "file".to_string(),
                file_name: "draft.txt".to_string(),
                content_type: "text/plain".to_string(),
                bytes: b"para one\n\npara two".to_vec(),
            }
        );
        assert_eq!(
            parts[1],
            FormPart::Text {
                name: "temperature".to_string(),
                value: "0.8".to_string()
            }
        );
        assert_eq!(
            parts[2],
            FormPart::Text {
                name: "use_knowledge_base".to_string(),
                value: "false".to_string()
            }
        );
    }

    #[test]
    fn build_health_probe_produces_get() {
        let req = client().build_health_probe();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:5000/api/health");
        assert!(req.body.is_empty());
    }

    #[test]
    fn parse_rewrite_accepts_any_2xx() {
        let result = client().parse_rewrite(response(202, r#"{"queued":true}"#)).unwrap();
        assert_eq!(result.as_value()["queued"], true);
    }

    #[test]
    fn parse_rewrite_service_error_keeps_status_and_body() {
        let err = client()
            .parse_rewrite(response(500, r#"{"error":"overloaded"}"#))
            .unwrap_err();
        match err {
            RewriteError::Service { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, r#"{"error":"overloaded"}"#);
            }
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rewrite_bad_json() {
        let err = client().parse_rewrite(response(200, "not json")).unwrap_err();
        assert!(matches!(err, RewriteError::Decode(_)));
    }

    #[test]
    fn parse_rewrite_empty_body_is_decode_error() {
        let err = client().parse_rewrite(response(200, "")).unwrap_err();
        assert!(matches!(err, RewriteError::Decode(_)));
    }

    #[test]
    fn parse_health_probe_alive() {
        let status = client()
            .parse_health_probe(response(200, r#"{"status":"ok","version":"1.0.0"}"#))
            .unwrap();
        assert!(status.is_alive());
        assert_eq!(status.report().version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn parse_health_probe_not_alive() {
        let status = client()
            .parse_health_probe(response(200, r#"{"status":"draining"}"#))
            .unwrap();
        assert!(!status.is_alive());
    }

    #[test]
    fn parse_health_probe_without_status_is_decode_error() {
        let err = client().parse_health_probe(response(200, r#"{}"#)).unwrap_err();
        assert!(matches!(err, RewriteError::Decode(_)));
    }

    #[test]
    fn parse_health_probe_surfaces_rejection() {
        let err = client().parse_health_probe(response(503, "unavailable")).unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn cancelled_handle_resolves_without_network() {
        // Nothing listens on the discard port; a pre-cancelled call must not
        // get far enough to notice.
        let client = RewriteClient::new(ServiceEndpoint::new("http://127.0.0.1:9", Duration::from_secs(5))).unwrap();
        let cancel = CancelHandle::new();
        cancel.cancel();
        let err = client
            .submit_text_with(&TextRewrite::new("x"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}

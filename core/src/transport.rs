//! Executes plain-data `HttpRequest`s over reqwest.
//!
//! Status codes are never treated as errors here: every reply that makes it
//! back is returned as an `HttpResponse` so `RewriteClient::parse_*` owns
//! status interpretation. Only connection-level failures become errors.

use reqwest::multipart::{Form, Part};
use uuid::Uuid;

use crate::error::RewriteError;
use crate::http::{FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn build_http_client() -> Result<reqwest::Client, RewriteError> {
    // Deadlines are enforced per call by `call::race`, not by reqwest.
    reqwest::Client::builder()
        .build()
        .map_err(|e| RewriteError::InvalidRequest(format!("failed to create HTTP client: {e}")))
}

fn into_form(parts: &[FormPart]) -> Result<Form, RewriteError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|e| RewriteError::InvalidRequest(format!("invalid mime {content_type}: {e}")))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

/// Send `req` and read the whole reply body.
pub(crate) async fn execute(
    client: &reqwest::Client,
    req: &HttpRequest,
    call_id: Uuid,
) -> Result<HttpResponse, RewriteError> {
    let mut builder = match req.method {
        HttpMethod::Get => client.get(&req.url),
        HttpMethod::Post => client.post(&req.url),
    };
    for (key, value) in &req.headers {
        builder = builder.header(key, value);
    }
    builder = builder.header(REQUEST_ID_HEADER, call_id.to_string());

    builder = match &req.body {
        RequestBody::Empty => builder,
        RequestBody::Json(body) => builder.body(body.clone()),
        RequestBody::Multipart(parts) => builder.multipart(into_form(parts)?),
    };

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (key.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.text().await?;

    Ok(HttpResponse { status, headers, body })
}

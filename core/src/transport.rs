//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. `UreqTransport` builds one
//! agent per request so each call gets its own timeout, and disables ureq's
//! status-as-error behavior so 4xx/5xx come back as data and status
//! interpretation stays in `AssistantClient`. Form bodies are encoded with
//! ureq's multipart support, which also sets the boundary header.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;
use ureq::typestate::WithBody;
use ureq::unversioned::multipart::{Form, Part};
use ureq::RequestBuilder;

use crate::error::ApiError;
use crate::http::{FormPart, HttpBody, HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip. Implementations are stateless per request.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by ureq.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let timeout = request.timeout;
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();

        let HttpRequest {
            method,
            path,
            headers,
            body,
            ..
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(agent.get(&path), &headers).call(),
            (HttpMethod::Delete, _) => with_headers(agent.delete(&path), &headers).call(),
            (HttpMethod::Post, body) => send(with_headers(agent.post(&path), &headers), body),
            (HttpMethod::Put, body) => send(with_headers(agent.put(&path), &headers), body),
            (HttpMethod::Patch, body) => send(with_headers(agent.patch(&path), &headers), body),
        };
        let mut response = result.map_err(|e| map_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| map_error(e, timeout))?;
        trace!(method = method.as_str(), url = %path, status, "response received");

        Ok(HttpResponse { status, headers, body })
    }
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<HttpBody>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        None => builder.send_empty(),
        Some(HttpBody::Bytes(bytes)) => builder.send(&bytes[..]),
        Some(HttpBody::Form(parts)) => builder.send(form(&parts)?),
    }
}

fn form(parts: &[FormPart]) -> Result<Form<'_>, ureq::Error> {
    parts.iter().try_fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => Ok(form.text(name, value)),
        FormPart::File {
            name,
            file_name,
            content_type,
            bytes,
        } => {
            let file = Part::bytes(bytes).file_name(file_name).mime_str(content_type)?;
            Ok(form.part(name, file))
        }
    })
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn map_error(err: ureq::Error, timeout: Duration) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::Timeout(timeout),
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => ApiError::Timeout(timeout),
        other => ApiError::Transport(other.to_string()),
    }
}

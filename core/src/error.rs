//! Error types for the assistant client.
//!
//! # Design
//! Two layers. `ApiError` is the technical failure produced by building,
//! executing, or parsing a request; `NotFound` and `Timeout` get dedicated
//! variants because callers treat them differently from other non-2xx
//! statuses. `GatewayError` is what screens see: a fixed, human-readable
//! message plus a coarse `ErrorKind`. The technical cause is logged by the
//! gateway and then dropped.

use std::time::Duration;

use thiserror::Error;

/// Technical errors returned by `AssistantClient` and `Transport`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The round-trip exceeded the request's timeout.
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The server returned 404: the requested entity does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// Connection refused, DNS failure, broken stream and the like.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A local file feeding the request could not be read.
    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },
}

/// Coarse classification of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The network round-trip exceeded its budget; the user should retry.
    Timeout,
    /// The server answered 404 for the addressed id.
    NotFound,
    /// Any other transport, status, or decoding failure.
    RequestFailed,
    /// A local precondition failed before any network call.
    Validation,
}

/// User-facing failure of a gateway call or a screen action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

/// Invalid value in an environment override.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

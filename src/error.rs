//! Error types for the request pipeline.
//!
//! Every stage returns `Result<_, ProxyError>`; the conversion to an HTTP
//! response happens once, at the handler boundary.

use axum::{
    http::{header::InvalidHeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::proxy::forwarder::ForwardError;
use crate::routing::target::{PROXY_USAGE, PROXY_EXAMPLE_PATH};

/// Errors that can occur while handling one proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Path is not `/proxy/{host}/...`.
    #[error("request path does not match /proxy/{{host}}/{{path}}")]
    InvalidFormat { allowed: Vec<String> },

    /// Shared secret missing or wrong.
    #[error("missing or invalid {header} header")]
    Unauthorized { header: String },

    /// Target host is not on the allowlist.
    #[error("host not allowed: {requested}")]
    HostNotAllowed {
        requested: String,
        allowed: Vec<String>,
    },

    /// Inbound body exceeds `limits.max_body_bytes`.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Request did not finish within `timeouts.request_secs`.
    #[error("request exceeded the {secs}s deadline")]
    Timeout { secs: u64 },

    /// Inbound body could not be read.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Upstream URL could not be built.
    #[error("invalid target url: {0}")]
    InvalidTarget(#[from] url::ParseError),

    /// Outbound header value could not be built.
    #[error("invalid outbound header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    /// Transport failure talking to the upstream.
    #[error(transparent)]
    Forward(#[from] ForwardError),

    /// Handler panicked.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ProxyError::HostNotAllowed { .. } => StatusCode::FORBIDDEN,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ProxyError::BodyRead(_)
            | ProxyError::InvalidTarget(_)
            | ProxyError::InvalidHeader(_)
            | ProxyError::Forward(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidFormat { .. } => "invalid_format",
            ProxyError::Unauthorized { .. } => "unauthorized",
            ProxyError::HostNotAllowed { .. } => "host_not_allowed",
            ProxyError::PayloadTooLarge { .. } => "payload_too_large",
            ProxyError::Timeout { .. } => "request_timeout",
            _ => "internal_error",
        }
    }

    /// Caller-facing message for internal errors. Never includes raw
    /// upstream or parser error text.
    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::BodyRead(_) => "failed to read request body",
            ProxyError::InvalidTarget(_) | ProxyError::InvalidHeader(_) => {
                "could not build upstream request"
            }
            ProxyError::Forward(ForwardError::Timeout(_)) => "upstream request timed out",
            ProxyError::Forward(ForwardError::Connect(_)) => "could not connect to upstream",
            ProxyError::Forward(_) => "upstream request failed",
            _ => "internal error",
        }
    }

    /// Render as a JSON error response, tagging internal errors with the
    /// request id so callers can quote it.
    pub fn to_response(&self, request_id: Option<&str>) -> Response {
        let body = match self {
            ProxyError::InvalidFormat { allowed } => json!({
                "error": "Invalid request format",
                "code": self.code(),
                "usage": PROXY_USAGE,
                "example": example_path(allowed),
                "allowed_hosts": allowed,
            }),
            ProxyError::Unauthorized { header } => json!({
                "error": "Unauthorized",
                "code": self.code(),
                "message": format!("Missing or invalid {header} header"),
            }),
            ProxyError::HostNotAllowed { requested, allowed } => json!({
                "error": "Host not allowed",
                "code": self.code(),
                "requested": requested,
                "allowed": allowed,
            }),
            ProxyError::PayloadTooLarge { limit } => json!({
                "error": "Payload too large",
                "code": self.code(),
                "limit_bytes": limit,
            }),
            ProxyError::Timeout { secs } => json!({
                "error": "Request timeout",
                "code": self.code(),
                "timeout_secs": secs,
                "request_id": request_id,
            }),
            _ => json!({
                "error": "Proxy error",
                "code": self.code(),
                "message": self.public_message(),
                "request_id": request_id,
            }),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.to_response(None)
    }
}

fn example_path(allowed: &[String]) -> String {
    match allowed.first() {
        Some(host) => format!("/proxy/{host}/markets"),
        None => PROXY_EXAMPLE_PATH.to_string(),
    }
}

/// Result type alias for pipeline stages.
pub type ProxyResult<T> = Result<T, ProxyError>;

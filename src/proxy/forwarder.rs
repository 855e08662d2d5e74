//! Outbound call to the upstream.
//!
//! # Responsibilities
//! - Issue exactly one request per inbound request
//! - Classify transport failures (timeout, connect, other)
//! - Hand back the upstream status, reason phrase, headers and a streaming body
//!
//! # Design Decisions
//! - No retries: a failed call is a failed request
//! - Redirects are relayed, not followed, so a 3xx can never take the
//!   proxy off the allowlist
//! - Timeouts only when configured
//! - Dropping the returned future cancels the in-flight call

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, StatusCode},
};
use futures_util::future::BoxFuture;
use hyper::ext::ReasonPhrase;
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;

/// Transport-level failure talking to the upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("could not connect to upstream: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream client error: {0}")]
    Other(String),
}

impl ForwardError {
    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Connect(_) => "connect",
            ForwardError::Transport(_) => "transport",
            ForwardError::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ForwardError::Timeout(e)
        } else if e.is_connect() {
            ForwardError::Connect(e)
        } else {
            ForwardError::Transport(e)
        }
    }
}

/// Fully built outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` for GET and HEAD.
    pub body: Option<Bytes>,
}

/// Upstream answer, body not yet consumed.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Status text, present only when the upstream sent a non-canonical one.
    pub reason: Option<ReasonPhrase>,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Something that can carry an [`OutboundRequest`] to the upstream.
pub trait Upstream: Send + Sync + 'static {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, ForwardError>>;
}

/// [`Upstream`] backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(timeouts: &TimeoutConfig) -> Result<Self, ForwardError> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(secs) = timeouts.connect_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = timeouts.upstream_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ForwardError::Other(e.to_string()))?;
        Ok(Self::new(client))
    }
}

impl Upstream for ReqwestUpstream {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, ForwardError>> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        Box::pin(async move {
            let response = builder.send().await?;
            let status = response.status();
            let reason = response.extensions().get::<ReasonPhrase>().cloned();
            let headers = response.headers().clone();
            let body = Body::from_stream(response.bytes_stream());

            Ok(UpstreamResponse {
                status,
                reason,
                headers,
                body,
            })
        })
    }
}

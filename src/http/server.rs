//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the single dispatch handler
//! - Wire up middleware (request ID, tracing, CORS floor)
//! - Bind server to listener, drain on shutdown
//! - Classify each request and run it through the pipeline, under the
//!   request deadline, turning panics into 500s
//! - Forward proxied requests to the resolved upstream

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN},
        HeaderValue, Request,
    },
    response::Response,
    routing::any,
    Router,
};
use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::{validate_config, ConfigError, ProxyConfig, ValidationError};
use crate::error::{ProxyError, ProxyResult};
use crate::http::classifier::{classify, RouteKind};
use crate::http::request::{
    method_carries_body, propagate_request_id_layer, read_body, set_request_id_layer, RequestIdExt,
};
use crate::http::response::{health_response, CorsHeaders};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::{relay, ForwardError, OutboundRequest, ProxyMarker, ReqwestUpstream, Upstream};
use crate::routing::{resolve, Allowlist};
use crate::security::{ApiKeyGate, HeaderPolicy};

/// Error building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] ForwardError),
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        ServerError::Config(ConfigError::Validation(vec![e]))
    }
}

/// Everything a request needs, compiled once from config.
pub struct AppInner {
    pub config: ProxyConfig,
    pub allowlist: Allowlist,
    pub headers: HeaderPolicy,
    pub gate: Option<ApiKeyGate>,
    pub cors: CorsHeaders,
    pub marker: ProxyMarker,
    pub upstream: Arc<dyn Upstream>,
    /// Whole-request deadline, from `timeouts.request_secs`.
    pub request_timeout: Option<Duration>,
}

impl AppInner {
    pub fn from_config(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Result<Self, ValidationError> {
        let allowlist = Allowlist::new(config.upstream.allowed_hosts.iter().cloned());
        if allowlist.is_empty() {
            return Err(ValidationError::EmptyAllowlist);
        }

        Ok(Self {
            allowlist,
            headers: HeaderPolicy::from_config(&config)?,
            gate: ApiKeyGate::from_config(&config.auth)?,
            cors: CorsHeaders::from_config(&config.cors)?,
            marker: ProxyMarker::from_config(&config.marker)?,
            upstream,
            request_timeout: config.timeouts.request_secs.map(Duration::from_secs),
            config,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppInner>,
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server that forwards over HTTPS with `reqwest`.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let upstream = ReqwestUpstream::from_config(&config.timeouts)?;
        Self::with_upstream(config, Arc::new(upstream))
    }

    /// Create a server with a caller-supplied upstream.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let state = AppState {
            inner: Arc::new(AppInner::from_config(config, upstream)?),
        };
        let router = Self::build_router(state.clone());

        tracing::info!(
            allowed_hosts = ?state.inner.allowlist.hosts(),
            copy_policy = state.inner.headers.copy_policy_name(),
            forward_credentials = state.inner.config.headers.forward_credentials,
            auth_enabled = state.inner.gate.is_some(),
            gate_health = state.inner.config.auth.gate_health,
            request_timeout_secs = ?state.inner.config.timeouts.request_secs,
            "Proxy pipeline ready"
        );

        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(set_request_id_layer())
            .layer(SetResponseHeaderLayer::if_not_present(
                ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("*"),
            ))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires or the process is told to terminate.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn make_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request.request_id().unwrap_or("unknown"),
    )
}

fn panic_detail(err: Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Single entry point for every request.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = classify(&method, request.uri().path());
    let request_id = request.request_id().unwrap_or("unknown").to_string();

    let work = AssertUnwindSafe(handle(&state.inner, route, request)).catch_unwind();
    let outcome = match state.inner.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(Err(ProxyError::Timeout {
                secs: limit.as_secs(),
            })),
        },
        None => work.await,
    };
    let result = outcome.unwrap_or_else(|panic| {
        let detail = panic_detail(panic);
        tracing::error!(request_id = %request_id, panic = %detail, "Handler panicked");
        Err(ProxyError::Internal(detail))
    });

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            if let ProxyError::Forward(fe) = &e {
                metrics::record_upstream_failure(fe.kind());
            }
            if e.status().is_server_error() {
                tracing::error!(request_id = %request_id, error = %e, "Request failed");
            } else {
                tracing::warn!(request_id = %request_id, code = e.code(), error = %e, "Request rejected");
            }
            e.to_response(Some(request_id.as_str()))
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), route.as_str(), start);
    response
}

async fn handle(inner: &AppInner, route: RouteKind, request: Request<Body>) -> ProxyResult<Response> {
    let verified = match &inner.gate {
        Some(gate) if gate.guards(route) => {
            gate.check(request.headers())?;
            true
        }
        _ => false,
    };

    match route {
        RouteKind::Preflight => Ok(inner.cors.preflight()),
        RouteKind::Health => Ok(health_response(&inner.config.service_name, verified)),
        RouteKind::Proxy => forward(inner, request).await,
    }
}

/// Resolve, rewrite headers, call the upstream once, relay its answer.
async fn forward(inner: &AppInner, request: Request<Body>) -> ProxyResult<Response> {
    let (parts, body) = request.into_parts();

    let target = resolve(parts.uri.path(), parts.uri.query(), &inner.allowlist)?;
    let url = target.url()?;
    let headers = inner
        .headers
        .outbound_headers(&parts.headers, &target, &parts.method)?;

    let body = if method_carries_body(&parts.method) {
        Some(read_body(body, inner.config.limits.max_body_bytes).await?)
    } else {
        None
    };

    tracing::debug!(
        method = %parts.method,
        target = %url,
        body_bytes = body.as_ref().map(|b| b.len()).unwrap_or(0),
        "Forwarding request"
    );

    let upstream = inner
        .upstream
        .send(OutboundRequest {
            method: parts.method,
            url: url.clone(),
            headers,
            body,
        })
        .await?;

    tracing::info!(target = %url, status = upstream.status.as_u16(), "Upstream responded");

    Ok(relay(upstream, &inner.cors, &inner.marker, &url))
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode},
    Router,
};
use futures_util::future::BoxFuture;
use tower::ServiceExt;

use allowlist_proxy::config::ProxyConfig;
use allowlist_proxy::proxy::{ForwardError, OutboundRequest, Upstream, UpstreamResponse};
use allowlist_proxy::HttpServer;

/// Canned answer for [`SpyUpstream`].
#[derive(Clone)]
pub enum Reply {
    Respond {
        status: StatusCode,
        headers: Vec<(&'static str, &'static str)>,
        body: Bytes,
    },
    Fail(&'static str),
    /// Never answers.
    Hang,
    /// Panics while answering.
    Panic(&'static str),
}

/// Upstream double that records every outbound call and answers with a
/// fixed [`Reply`].
#[derive(Clone)]
pub struct SpyUpstream {
    calls: Arc<Mutex<Vec<OutboundRequest>>>,
    reply: Reply,
}

impl SpyUpstream {
    pub fn new(reply: Reply) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            reply,
        }
    }

    pub fn ok_json(body: &'static str) -> Self {
        Self::respond(StatusCode::OK, &[("content-type", "application/json")], body)
    }

    pub fn respond(status: StatusCode, headers: &[(&'static str, &'static str)], body: &'static str) -> Self {
        Self::new(Reply::Respond {
            status,
            headers: headers.to_vec(),
            body: Bytes::from_static(body.as_bytes()),
        })
    }

    pub fn failing(message: &'static str) -> Self {
        Self::new(Reply::Fail(message))
    }

    pub fn hanging() -> Self {
        Self::new(Reply::Hang)
    }

    pub fn panicking(message: &'static str) -> Self {
        Self::new(Reply::Panic(message))
    }

    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> OutboundRequest {
        self.calls().pop().expect("upstream was never called")
    }
}

impl Upstream for SpyUpstream {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, ForwardError>> {
        self.calls.lock().unwrap().push(request);
        let reply = self.reply.clone();

        Box::pin(async move {
            match reply {
                Reply::Respond { status, headers, body } => {
                    let mut map = HeaderMap::new();
                    for (name, value) in headers {
                        map.append(
                            HeaderName::from_static(name),
                            HeaderValue::from_static(value),
                        );
                    }
                    Ok(UpstreamResponse {
                        status,
                        reason: None,
                        headers: map,
                        body: Body::from(body),
                    })
                }
                Reply::Fail(message) => Err(ForwardError::Other(message.to_string())),
                Reply::Hang => std::future::pending().await,
                Reply::Panic(message) => panic!("{message}"),
            }
        })
    }
}

/// Router for `config` wired to `spy`.
pub fn router_with(config: ProxyConfig, spy: &SpyUpstream) -> Router {
    HttpServer::with_upstream(config, Arc::new(spy.clone()))
        .expect("config should be valid")
        .router()
}

/// Run one request through the router in-process.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Default config with the shared-secret gate switched on.
pub fn gated_config(key: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.auth.enabled = true;
    config.auth.api_key = key.to_string();
    config
}

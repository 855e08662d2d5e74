//! Request handling helpers.
//!
//! # Responsibilities
//! - Request ID generation and propagation (`x-request-id`)
//! - Read the inbound body under the configured size limit
//! - Decide which methods carry a body upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller-supplied request ID is kept, never forwarded upstream
//! - GET and HEAD never carry a body, even if the caller sent one

use axum::{
    body::{Body, Bytes},
    http::{HeaderName, Method, Request},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::error::{ProxyError, ProxyResult};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a UUID v4 request ID when the caller sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Access to the request ID set by [`set_request_id_layer`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
    }
}

/// Whether an outbound request with this method carries a body.
pub fn method_carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Buffer the inbound body, failing once it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> ProxyResult<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProxyError::PayloadTooLarge { limit })
        }
        Err(e) => Err(ProxyError::BodyRead(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_methods() {
        assert!(!method_carries_body(&Method::GET));
        assert!(!method_carries_body(&Method::HEAD));
        assert!(method_carries_body(&Method::POST));
        assert!(method_carries_body(&Method::PUT));
        assert!(method_carries_body(&Method::DELETE));
        assert!(method_carries_body(&Method::PATCH));
    }

    #[tokio::test]
    async fn test_read_body_exact_bytes() {
        let bytes = read_body(Body::from(r#"{"a":1}"#), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let err = read_body(Body::from(vec![0u8; 32]), 16).await.unwrap_err();
        assert!(matches!(err, ProxyError::PayloadTooLarge { limit: 16 }));
    }

    #[test]
    fn test_request_id_ext() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "abc-123")
            .body(())
            .unwrap();
        assert_eq!(req.request_id(), Some("abc-123"));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(req.request_id(), None);
    }
}

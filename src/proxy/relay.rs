//! Relay of the upstream response to the caller.
//!
//! Status, status text and headers are copied as received, multi-valued
//! headers included. Hop-by-hop headers are dropped because framing belongs to the
//! caller's connection. CORS and marker headers are laid over the top.

use axum::{
    http::{HeaderName, HeaderValue},
    response::Response,
};
use url::Url;

use crate::config::{MarkerConfig, ValidationError};
use crate::http::response::CorsHeaders;
use crate::proxy::forwarder::UpstreamResponse;
use crate::security::headers::HOP_BY_HOP;

/// Headers identifying the proxy on relayed responses.
#[derive(Debug, Clone)]
pub struct ProxyMarker {
    header: HeaderName,
    value: HeaderValue,
    target_url_header: Option<HeaderName>,
}

impl ProxyMarker {
    pub fn from_config(config: &MarkerConfig) -> Result<Self, ValidationError> {
        let name = |field: &'static str, raw: &str| {
            HeaderName::from_bytes(raw.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
                field,
                name: raw.to_string(),
            })
        };

        let target_url_header = if config.expose_target_url {
            Some(name("marker.target_url_header", &config.target_url_header)?)
        } else {
            None
        };

        Ok(Self {
            header: name("marker.header", &config.header)?,
            value: HeaderValue::from_str(&config.value)
                .map_err(|_| ValidationError::InvalidHeaderValue { field: "marker.value" })?,
            target_url_header,
        })
    }
}

/// Build the caller-facing response from the upstream one.
pub fn relay(upstream: UpstreamResponse, cors: &CorsHeaders, marker: &ProxyMarker, target: &Url) -> Response {
    let UpstreamResponse {
        status,
        reason,
        mut headers,
        body,
    } = upstream;

    for name in HOP_BY_HOP {
        headers.remove(*name);
    }

    cors.apply(&mut headers);
    headers.insert(marker.header.clone(), marker.value.clone());
    if let Some(name) = &marker.target_url_header {
        if let Ok(value) = HeaderValue::from_str(target.as_str()) {
            headers.insert(name.clone(), value);
        }
    }

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use hyper::ext::ReasonPhrase;
    use axum::{
        body::Body,
        http::{header, HeaderMap, StatusCode},
    };

    fn upstream(status: StatusCode, pairs: &[(&str, &str)], body: &'static str) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(
                HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        UpstreamResponse {
            status,
            reason: None,
            headers,
            body: Body::from(body),
        }
    }

    fn parts() -> (CorsHeaders, ProxyMarker, Url) {
        (
            CorsHeaders::from_config(&CorsConfig::default()).unwrap(),
            ProxyMarker::from_config(&MarkerConfig::default()).unwrap(),
            Url::parse("https://clob.polymarket.com/markets?x=1").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_relays_status_headers_body() {
        let (cors, marker, url) = parts();
        let response = relay(
            upstream(
                StatusCode::TOO_MANY_REQUESTS,
                &[
                    ("content-type", "application/json"),
                    ("set-cookie", "a=1"),
                    ("set-cookie", "b=2"),
                    ("transfer-encoding", "chunked"),
                    ("access-control-allow-origin", "https://polymarket.com"),
                ],
                r#"{"error":"rate limited"}"#,
            ),
            &cors,
            &marker,
            &url,
        );

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert_eq!(headers["x-proxied-by"], "allowlist-proxy");
        assert_eq!(headers["x-target-url"], "https://clob.polymarket.com/markets?x=1");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"error":"rate limited"}"#);
    }

    #[test]
    fn test_reason_phrase_carried() {
        let (cors, marker, url) = parts();
        let mut from_upstream = upstream(StatusCode::IM_A_TEAPOT, &[], "");
        from_upstream.reason = Some(ReasonPhrase::from_static(b"Totally Custom"));

        let response = relay(from_upstream, &cors, &marker, &url);
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(
            response.extensions().get::<ReasonPhrase>().map(|r| r.as_bytes()),
            Some(&b"Totally Custom"[..])
        );
    }

    #[test]
    fn test_target_url_can_be_hidden() {
        let (cors, _, url) = parts();
        let marker = ProxyMarker::from_config(&MarkerConfig {
            expose_target_url: false,
            ..MarkerConfig::default()
        })
        .unwrap();

        let response = relay(upstream(StatusCode::OK, &[], ""), &cors, &marker, &url);
        assert!(!response.headers().contains_key("x-target-url"));
        assert!(response.headers().contains_key("x-proxied-by"));
    }
}

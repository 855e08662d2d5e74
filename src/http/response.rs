//! Response construction.
//!
//! # Responsibilities
//! - CORS preflight responses
//! - CORS overlay on relayed upstream responses
//! - Health report
//!
//! # Design Decisions
//! - Preflight answers every path, including unknown ones
//! - Header values are validated once at startup, not per request
//! - Health timestamps are RFC 3339 UTC with millisecond precision

use axum::{
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{CorsConfig, ValidationError};

fn wildcard() -> HeaderValue {
    HeaderValue::from_static("*")
}

/// Compiled CORS header values.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_methods: HeaderValue,
    max_age: HeaderValue,
    expose_headers: bool,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ValidationError> {
        let allow_methods = HeaderValue::from_str(&config.allow_methods).map_err(|_| {
            ValidationError::InvalidHeaderValue {
                field: "cors.allow_methods",
            }
        })?;

        Ok(Self {
            allow_methods,
            max_age: HeaderValue::from(config.max_age_secs),
            expose_headers: config.expose_headers,
        })
    }

    /// Empty 204 answering a CORS preflight.
    pub fn preflight(&self) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, wildcard());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, wildcard());
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }

    /// Overlay CORS headers on a relayed response, replacing upstream values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, wildcard());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, wildcard());
        if self.expose_headers {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, wildcard());
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport<'a> {
    pub status: &'static str,
    pub service: &'a str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<&'static str>,
}

/// 200 health report. `verified` adds `"auth": "verified"`.
pub fn health_response(service: &str, verified: bool) -> Response {
    let report = HealthReport {
        status: "ok",
        service,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        auth: verified.then_some("verified"),
    };
    (StatusCode::OK, Json(report)).into_response()
}

//! Shared-secret gate.
//!
//! Preflight requests are never gated; whether the health route is gated
//! comes from `auth.gate_health`.

use axum::http::{HeaderMap, HeaderName};

use crate::config::{AuthConfig, ValidationError};
use crate::error::{ProxyError, ProxyResult};
use crate::http::classifier::RouteKind;

#[derive(Debug, Clone)]
pub struct ApiKeyGate {
    header: HeaderName,
    display_name: String,
    key: String,
    gate_health: bool,
}

impl ApiKeyGate {
    pub fn new(header: HeaderName, key: impl Into<String>, gate_health: bool) -> Self {
        Self {
            display_name: header.as_str().to_string(),
            header,
            key: key.into(),
            gate_health,
        }
    }

    /// Gate from config; `None` when gating is off.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, ValidationError> {
        if !config.enabled {
            return Ok(None);
        }
        if config.api_key.is_empty() {
            return Err(ValidationError::MissingApiKey);
        }
        let header = HeaderName::from_bytes(config.header.as_bytes()).map_err(|_| {
            ValidationError::InvalidHeaderName {
                field: "auth.header",
                name: config.header.clone(),
            }
        })?;

        let mut gate = Self::new(header, config.api_key.clone(), config.gate_health);
        gate.display_name = config.header.clone();
        Ok(Some(gate))
    }

    /// Whether requests on `route` must present the secret.
    pub fn guards(&self, route: RouteKind) -> bool {
        match route {
            RouteKind::Preflight => false,
            RouteKind::Health => self.gate_health,
            RouteKind::Proxy => true,
        }
    }

    /// Check the presented secret. With duplicate headers the last one counts.
    pub fn check(&self, headers: &HeaderMap) -> ProxyResult<()> {
        let presented = headers
            .get_all(&self.header)
            .iter()
            .last()
            .map(|v| v.as_bytes());

        match presented {
            Some(value) if keys_match(value, self.key.as_bytes()) => Ok(()),
            _ => Err(ProxyError::Unauthorized {
                header: self.display_name.clone(),
            }),
        }
    }
}

/// Comparison whose running time does not depend on where the inputs differ.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

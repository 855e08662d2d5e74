//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Allowlist entries are bare hostnames
//! - Header names and values configured anywhere are valid HTTP
//! - Gating has a secret, limits are non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.allowed_hosts must not be empty")]
    EmptyAllowlist,

    #[error("upstream.allowed_hosts entry {0:?} is not a bare lowercase hostname")]
    InvalidHost(String),

    #[error("{field}: {name:?} is not a valid header name")]
    InvalidHeaderName { field: &'static str, name: String },

    #[error("{field}: value is not a valid header value")]
    InvalidHeaderValue { field: &'static str },

    #[error("impersonation.site_origin {0:?} must be an absolute http(s) origin")]
    InvalidSiteOrigin(String),

    #[error("auth.enabled is set but auth.api_key is empty")]
    MissingApiKey,

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstream.allowed_hosts.is_empty() {
        errors.push(ValidationError::EmptyAllowlist);
    }
    for host in &config.upstream.allowed_hosts {
        if !is_bare_host(host) {
            errors.push(ValidationError::InvalidHost(host.clone()));
        }
    }

    check_names(&mut errors, "headers.copy", &config.headers.copy);
    check_names(
        &mut errors,
        "headers.credential_headers",
        &config.headers.credential_headers,
    );
    check_names(&mut errors, "headers.excluded", &config.headers.excluded);

    let imp = &config.impersonation;
    if !is_origin(&imp.site_origin) {
        errors.push(ValidationError::InvalidSiteOrigin(imp.site_origin.clone()));
    }
    for (field, value) in [
        ("impersonation.user_agent", &imp.user_agent),
        ("impersonation.accept", &imp.accept),
        ("impersonation.accept_language", &imp.accept_language),
        ("impersonation.accept_encoding", &imp.accept_encoding),
        ("impersonation.sec_ch_ua", &imp.sec_ch_ua),
        ("impersonation.sec_ch_ua_mobile", &imp.sec_ch_ua_mobile),
        ("impersonation.sec_ch_ua_platform", &imp.sec_ch_ua_platform),
        ("impersonation.sec_fetch_mode", &imp.sec_fetch_mode),
        ("impersonation.sec_fetch_dest", &imp.sec_fetch_dest),
        ("impersonation.sec_fetch_site", &imp.sec_fetch_site),
        ("cors.allow_methods", &config.cors.allow_methods),
        ("marker.value", &config.marker.value),
    ] {
        check_value(&mut errors, field, value);
    }

    check_name(&mut errors, "auth.header", &config.auth.header);
    check_name(&mut errors, "marker.header", &config.marker.header);
    check_name(
        &mut errors,
        "marker.target_url_header",
        &config.marker.target_url_header,
    );

    if config.auth.enabled && config.auth.api_key.is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }
    if config.auth.enabled {
        check_value(&mut errors, "auth.api_key", &config.auth.api_key);
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }
    for (field, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == Some(0) {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A host usable as `https://{host}` with nothing but the host in it.
fn is_bare_host(host: &str) -> bool {
    if host.is_empty() || host.contains(['/', '?', '#', '@', ':']) {
        return false;
    }
    Url::parse(&format!("https://{host}/"))
        .map(|url| url.host_str() == Some(host))
        .unwrap_or(false)
}

fn is_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
        }
        Err(_) => false,
    }
}

fn check_names(errors: &mut Vec<ValidationError>, field: &'static str, names: &[String]) {
    for name in names {
        check_name(errors, field, name);
    }
}

fn check_name(errors: &mut Vec<ValidationError>, field: &'static str, name: &str) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            name: name.to_string(),
        });
    }
}

fn check_value(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderValue::from_str(value).is_err() {
        errors.push(ValidationError::InvalidHeaderValue { field });
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a missing file or section still yields a
//! working proxy for the stock allowlist.

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Name reported by the health endpoint.
    pub service_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream hosts this proxy may reach.
    pub upstream: UpstreamConfig,

    /// Outbound header copy policy.
    pub headers: HeadersConfig,

    /// Fixed browser identity applied to every outbound request.
    pub impersonation: ImpersonationConfig,

    /// Shared-secret gate.
    pub auth: AuthConfig,

    /// CORS headers on preflight and relayed responses.
    pub cors: CorsConfig,

    /// Diagnostic headers identifying the proxy on relayed responses.
    pub marker: MarkerConfig,

    /// Timeout configuration. Every timeout is off unless set.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            service_name: "Polymarket Proxy".to_string(),
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            headers: HeadersConfig::default(),
            impersonation: ImpersonationConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            marker: MarkerConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream allowlist.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bare hostnames, matched exactly and case-sensitively.
    pub allowed_hosts: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec![
                "clob.polymarket.com".to_string(),
                "gamma-api.polymarket.com".to_string(),
                "polymarket.com".to_string(),
            ],
        }
    }
}

/// Which inbound headers are candidates for copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Copy only the names listed in `headers.copy` (and credentials).
    #[default]
    Allowlist,
    /// Copy everything that is not excluded.
    Blocklist,
}

/// Outbound header copy policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Copy strategy.
    pub policy: CopyMode,

    /// Names copied in allowlist mode, credential headers aside.
    pub copy: Vec<String>,

    /// Forward the caller's credential headers upstream.
    ///
    /// Off means the upstream never sees caller credentials, whichever copy
    /// mode is active.
    pub forward_credentials: bool,

    /// Header names treated as caller credentials.
    pub credential_headers: Vec<String>,

    /// Extra names that are never copied, on top of the built-in exclusions.
    pub excluded: Vec<String>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            policy: CopyMode::Allowlist,
            copy: vec!["content-type".to_string()],
            forward_credentials: true,
            credential_headers: [
                "authorization",
                "poly-api-key",
                "poly-signature",
                "poly-timestamp",
                "poly-passphrase",
                "poly-address",
                "poly-nonce",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            excluded: Vec::new(),
        }
    }
}

/// Browser identity presented to the upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImpersonationConfig {
    /// Canonical site origin used for `Origin` and `Referer`.
    pub site_origin: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
    pub sec_fetch_mode: String,
    pub sec_fetch_dest: String,
    pub sec_fetch_site: String,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            site_origin: "https://polymarket.com".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept: "application/json, text/plain, */*".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            accept_encoding: "gzip, deflate, br".to_string(),
            sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\""
                .to_string(),
            sec_ch_ua_mobile: "?0".to_string(),
            sec_ch_ua_platform: "\"macOS\"".to_string(),
            sec_fetch_mode: "cors".to_string(),
            sec_fetch_dest: "empty".to_string(),
            sec_fetch_site: "same-site".to_string(),
        }
    }
}

/// Shared-secret gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require the secret on every non-preflight route.
    pub enabled: bool,

    /// The shared secret. Prefer `PROXY_API_KEY` over writing it to disk.
    pub api_key: String,

    /// Header carrying the secret.
    pub header: String,

    /// Whether `/` and `/health` are gated too.
    pub gate_health: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            header: "X-API-Key".to_string(),
            gate_health: true,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Methods` on preflight responses.
    pub allow_methods: String,

    /// Value of `Access-Control-Max-Age` on preflight responses.
    pub max_age_secs: u64,

    /// Add `Access-Control-Expose-Headers: *` to relayed responses.
    pub expose_headers: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            max_age_secs: 86_400,
            expose_headers: true,
        }
    }
}

/// Proxy identity headers on relayed responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub header: String,
    pub value: String,

    /// Echo the resolved upstream URL back to the caller.
    pub expose_target_url: bool,
    pub target_url_header: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            header: "X-Proxied-By".to_string(),
            value: "allowlist-proxy".to_string(),
            expose_target_url: true,
            target_url_header: "X-Target-URL".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Upstream call timeout (send + receive headers + body) in seconds.
    pub upstream_secs: Option<u64>,

    /// Whole inbound request deadline in seconds.
    pub request_secs: Option<u64>,
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Outbound header policy.
//!
//! # Responsibilities
//! - Drop platform-injected, client-IP, hop-by-hop and gating headers
//! - Copy the remaining inbound headers under the configured strategy
//! - Apply the fixed browser identity on top of whatever was copied
//!
//! # Design Decisions
//! - The copy strategy is a trait object (`CopyPolicy`) so it can be swapped
//!   without touching exclusions or overrides
//! - Exclusions are checked before the strategy; no strategy can leak them
//! - Overrides always replace copied values of the same name
//! - Duplicate inbound headers: the last value wins

use std::fmt;

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method,
};

use crate::config::{CopyMode, ProxyConfig, ValidationError};
use crate::error::ProxyResult;
use crate::http::request::method_carries_body;
use crate::routing::TargetDescriptor;

/// Header-name prefixes added by the hosting platform's edge.
const PLATFORM_PREFIXES: &[&str] = &["cf-"];

/// Names never copied upstream, whatever the policy.
const ALWAYS_EXCLUDED: &[&str] = &[
    "host",
    // client address
    "x-forwarded-for",
    "x-forwarded-host",
    "x-forwarded-proto",
    "x-forwarded-port",
    "forwarded",
    "x-real-ip",
    "true-client-ip",
    // browser context, replaced by the impersonated identity
    "origin",
    "referer",
    "cookie",
    // platform metadata and tracing
    "cdn-loop",
    "x-amzn-trace-id",
    "x-request-id",
    "traceparent",
    "tracestate",
    // framing, owned by the outbound client
    "content-length",
];

/// Connection-scoped headers (RFC 9110 §7.6.1).
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub const APPLICATION_JSON: &str = "application/json";

/// Decides which non-excluded inbound headers are copied.
pub trait CopyPolicy: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether a header that survived the exclusion set is copied.
    fn admits(&self, name: &HeaderName) -> bool;
}

/// Copy only an explicit set of names.
#[derive(Debug, Clone)]
pub struct AllowlistCopy {
    names: Vec<HeaderName>,
}

impl AllowlistCopy {
    pub fn new(names: Vec<HeaderName>) -> Self {
        Self { names }
    }
}

impl CopyPolicy for AllowlistCopy {
    fn name(&self) -> &'static str {
        "allowlist"
    }

    fn admits(&self, name: &HeaderName) -> bool {
        self.names.contains(name)
    }
}

/// Copy everything except an explicit set of names.
#[derive(Debug, Clone)]
pub struct BlocklistCopy {
    denied: Vec<HeaderName>,
}

impl BlocklistCopy {
    pub fn new(denied: Vec<HeaderName>) -> Self {
        Self { denied }
    }
}

impl CopyPolicy for BlocklistCopy {
    fn name(&self) -> &'static str {
        "blocklist"
    }

    fn admits(&self, name: &HeaderName) -> bool {
        !self.denied.contains(name)
    }
}

/// Headers that are never copied upstream.
#[derive(Debug, Clone)]
pub struct Exclusions {
    names: Vec<HeaderName>,
}

impl Exclusions {
    /// Built-in exclusions plus `extra`.
    pub fn new(extra: impl IntoIterator<Item = HeaderName>) -> Self {
        let mut names: Vec<HeaderName> = ALWAYS_EXCLUDED
            .iter()
            .chain(HOP_BY_HOP)
            .map(|n| HeaderName::from_static(*n))
            .collect();
        for name in extra {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self { names }
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        let name_str = name.as_str();
        PLATFORM_PREFIXES.iter().any(|p| name_str.starts_with(p)) || self.names.contains(name)
    }
}

/// Builds the outbound header set for one request.
#[derive(Debug)]
pub struct HeaderPolicy {
    copy: Box<dyn CopyPolicy>,
    exclusions: Exclusions,
    overrides: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderPolicy {
    pub fn new(
        copy: Box<dyn CopyPolicy>,
        exclusions: Exclusions,
        overrides: Vec<(HeaderName, HeaderValue)>,
    ) -> Self {
        Self {
            copy,
            exclusions,
            overrides,
        }
    }

    /// Compile the policy described by `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ValidationError> {
        let headers = &config.headers;
        let credentials = parse_names("headers.credential_headers", &headers.credential_headers)?;

        let copy: Box<dyn CopyPolicy> = match headers.policy {
            CopyMode::Allowlist => {
                let mut names = parse_names("headers.copy", &headers.copy)?;
                if headers.forward_credentials {
                    names.extend(credentials);
                }
                Box::new(AllowlistCopy::new(names))
            }
            CopyMode::Blocklist => {
                let denied = if headers.forward_credentials {
                    Vec::new()
                } else {
                    credentials
                };
                Box::new(BlocklistCopy::new(denied))
            }
        };

        let mut extra = parse_names("headers.excluded", &headers.excluded)?;
        if config.auth.enabled {
            extra.push(parse_name("auth.header", &config.auth.header)?);
        }

        Ok(Self::new(copy, Exclusions::new(extra), impersonation_overrides(config)?))
    }

    /// Swap the copy strategy, keeping exclusions and overrides.
    pub fn with_copy_policy(mut self, copy: Box<dyn CopyPolicy>) -> Self {
        self.copy = copy;
        self
    }

    pub fn copy_policy_name(&self) -> &'static str {
        self.copy.name()
    }

    /// Outbound headers for a request to `target`.
    pub fn outbound_headers(
        &self,
        inbound: &HeaderMap,
        target: &TargetDescriptor,
        method: &Method,
    ) -> ProxyResult<HeaderMap> {
        let mut outbound = HeaderMap::new();

        for (name, value) in inbound {
            if self.exclusions.contains(name) || !self.copy.admits(name) {
                continue;
            }
            outbound.insert(name.clone(), value.clone());
        }

        for (name, value) in &self.overrides {
            outbound.insert(name.clone(), value.clone());
        }
        outbound.insert(header::HOST, HeaderValue::from_str(target.host())?);

        if method_carries_body(method) && !outbound.contains_key(header::CONTENT_TYPE) {
            outbound.insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }

        Ok(outbound)
    }
}

fn impersonation_overrides(
    config: &ProxyConfig,
) -> Result<Vec<(HeaderName, HeaderValue)>, ValidationError> {
    let imp = &config.impersonation;
    let origin = imp.site_origin.trim_end_matches('/');
    let referer = format!("{origin}/");

    let pairs: [(HeaderName, &'static str, &str); 12] = [
        (header::USER_AGENT, "impersonation.user_agent", imp.user_agent.as_str()),
        (header::ACCEPT, "impersonation.accept", imp.accept.as_str()),
        (header::ACCEPT_LANGUAGE, "impersonation.accept_language", imp.accept_language.as_str()),
        (header::ACCEPT_ENCODING, "impersonation.accept_encoding", imp.accept_encoding.as_str()),
        (header::ORIGIN, "impersonation.site_origin", origin),
        (header::REFERER, "impersonation.site_origin", referer.as_str()),
        (HeaderName::from_static("sec-ch-ua"), "impersonation.sec_ch_ua", imp.sec_ch_ua.as_str()),
        (
            HeaderName::from_static("sec-ch-ua-mobile"),
            "impersonation.sec_ch_ua_mobile",
            imp.sec_ch_ua_mobile.as_str(),
        ),
        (
            HeaderName::from_static("sec-ch-ua-platform"),
            "impersonation.sec_ch_ua_platform",
            imp.sec_ch_ua_platform.as_str(),
        ),
        (
            HeaderName::from_static("sec-fetch-mode"),
            "impersonation.sec_fetch_mode",
            imp.sec_fetch_mode.as_str(),
        ),
        (
            HeaderName::from_static("sec-fetch-dest"),
            "impersonation.sec_fetch_dest",
            imp.sec_fetch_dest.as_str(),
        ),
        (
            HeaderName::from_static("sec-fetch-site"),
            "impersonation.sec_fetch_site",
            imp.sec_fetch_site.as_str(),
        ),
    ];

    pairs
        .into_iter()
        .map(|(name, field, value)| {
            HeaderValue::from_str(value)
                .map(|v| (name, v))
                .map_err(|_| ValidationError::InvalidHeaderValue { field })
        })
        .collect()
}

fn parse_name(field: &'static str, name: &str) -> Result<HeaderName, ValidationError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
        field,
        name: name.to_string(),
    })
}

fn parse_names(field: &'static str, names: &[String]) -> Result<Vec<HeaderName>, ValidationError> {
    names.iter().map(|n| parse_name(field, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{resolve, Allowlist};

    fn target(host: &str) -> TargetDescriptor {
        resolve(&format!("/proxy/{host}/markets"), None, &Allowlist::new([host])).unwrap()
    }

    fn inbound(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(
                HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    fn policy_with(mutate: impl FnOnce(&mut ProxyConfig)) -> HeaderPolicy {
        let mut config = ProxyConfig::default();
        mutate(&mut config);
        HeaderPolicy::from_config(&config).unwrap()
    }

    #[test]
    fn test_allowlist_copies_only_listed() {
        let policy = policy_with(|_| {});
        let headers = policy
            .outbound_headers(
                &inbound(&[
                    ("content-type", "text/plain"),
                    ("poly-api-key", "k"),
                    ("x-custom", "nope"),
                    ("cookie", "session=1"),
                ]),
                &target("clob.polymarket.com"),
                &Method::POST,
            )
            .unwrap();

        assert_eq!(headers["content-type"], "text/plain");
        assert_eq!(headers["poly-api-key"], "k");
        assert!(!headers.contains_key("x-custom"));
        assert!(!headers.contains_key("cookie"));
    }

    #[test]
    fn test_blocklist_copies_everything_else() {
        let policy = policy_with(|c| c.headers.policy = CopyMode::Blocklist);
        let headers = policy
            .outbound_headers(
                &inbound(&[
                    ("x-custom", "yes"),
                    ("cf-ray", "abc"),
                    ("x-forwarded-for", "1.2.3.4"),
                    ("cookie", "session=1"),
                ]),
                &target("polymarket.com"),
                &Method::GET,
            )
            .unwrap();

        assert_eq!(headers["x-custom"], "yes");
        assert!(!headers.contains_key("cf-ray"));
        assert!(!headers.contains_key("x-forwarded-for"));
        assert!(!headers.contains_key("cookie"));
    }

    #[test]
    fn test_platform_headers_never_forwarded() {
        let platform = [
            ("cf-connecting-ip", "1.2.3.4"),
            ("cf-ipcountry", "US"),
            ("cf-visitor", "{\"scheme\":\"https\"}"),
            ("x-real-ip", "1.2.3.4"),
            ("true-client-ip", "1.2.3.4"),
            ("connection", "keep-alive"),
        ];
        for mode in [CopyMode::Allowlist, CopyMode::Blocklist] {
            let policy = policy_with(|c| {
                c.headers.policy = mode;
                c.headers.copy = platform.iter().map(|(k, _)| k.to_string()).collect();
            });
            let headers = policy
                .outbound_headers(&inbound(&platform), &target("polymarket.com"), &Method::GET)
                .unwrap();
            for (name, _) in platform {
                assert!(!headers.contains_key(name), "{name} leaked under {mode:?}");
            }
        }
    }

    #[test]
    fn test_overrides_win() {
        let policy = policy_with(|c| c.headers.policy = CopyMode::Blocklist);
        let headers = policy
            .outbound_headers(
                &inbound(&[
                    ("origin", "https://attacker.example"),
                    ("referer", "https://attacker.example/page"),
                    ("user-agent", "curl/8.0"),
                    ("host", "proxy.example"),
                ]),
                &target("gamma-api.polymarket.com"),
                &Method::GET,
            )
            .unwrap();

        assert_eq!(headers["origin"], "https://polymarket.com");
        assert_eq!(headers["referer"], "https://polymarket.com/");
        assert!(headers["user-agent"].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(headers["host"], "gamma-api.polymarket.com");
        assert_eq!(headers["sec-fetch-site"], "same-site");
        assert_eq!(headers.get_all("origin").iter().count(), 1);
    }

    #[test]
    fn test_gating_header_never_forwarded() {
        let policy = policy_with(|c| {
            c.headers.policy = CopyMode::Blocklist;
            c.auth.enabled = true;
            c.auth.api_key = "secret".into();
        });
        let headers = policy
            .outbound_headers(
                &inbound(&[("x-api-key", "secret")]),
                &target("polymarket.com"),
                &Method::GET,
            )
            .unwrap();
        assert!(!headers.contains_key("x-api-key"));
    }

    #[test]
    fn test_credentials_withheld_when_disabled() {
        for mode in [CopyMode::Allowlist, CopyMode::Blocklist] {
            let policy = policy_with(|c| {
                c.headers.policy = mode;
                c.headers.forward_credentials = false;
            });
            let headers = policy
                .outbound_headers(
                    &inbound(&[("authorization", "Bearer t"), ("poly-signature", "sig")]),
                    &target("clob.polymarket.com"),
                    &Method::GET,
                )
                .unwrap();
            assert!(!headers.contains_key("authorization"));
            assert!(!headers.contains_key("poly-signature"));
        }
    }

    #[test]
    fn test_default_content_type_for_body_methods() {
        let policy = policy_with(|_| {});
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let headers = policy
                .outbound_headers(&HeaderMap::new(), &target("polymarket.com"), &method)
                .unwrap();
            assert_eq!(headers["content-type"], APPLICATION_JSON);
        }
        for method in [Method::GET, Method::HEAD] {
            let headers = policy
                .outbound_headers(&HeaderMap::new(), &target("polymarket.com"), &method)
                .unwrap();
            assert!(!headers.contains_key("content-type"));
        }
    }

    #[test]
    fn test_last_duplicate_wins() {
        let policy = policy_with(|_| {});
        let headers = policy
            .outbound_headers(
                &inbound(&[("content-type", "text/plain"), ("content-type", "application/xml")]),
                &target("polymarket.com"),
                &Method::POST,
            )
            .unwrap();
        assert_eq!(headers.get_all("content-type").iter().count(), 1);
        assert_eq!(headers["content-type"], "application/xml");
    }

    #[test]
    fn test_deterministic() {
        let policy = policy_with(|c| c.headers.policy = CopyMode::Blocklist);
        let input = inbound(&[("x-a", "1"), ("content-type", "application/json")]);
        let first = policy
            .outbound_headers(&input, &target("polymarket.com"), &Method::GET)
            .unwrap();
        let second = policy
            .outbound_headers(&input, &target("polymarket.com"), &Method::GET)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_swapped_copy_policy() {
        let policy = policy_with(|_| {})
            .with_copy_policy(Box::new(AllowlistCopy::new(vec![HeaderName::from_static("x-trace")])));
        assert_eq!(policy.copy_policy_name(), "allowlist");

        let headers = policy
            .outbound_headers(
                &inbound(&[("x-trace", "t"), ("poly-api-key", "k")]),
                &target("polymarket.com"),
                &Method::GET,
            )
            .unwrap();
        assert_eq!(headers["x-trace"], "t");
        assert!(!headers.contains_key("poly-api-key"));
    }
}

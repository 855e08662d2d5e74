//! Target resolution: `/proxy/{host}/{rest...}` → upstream URL.
//!
//! # Responsibilities
//! - Split the inbound path and pick out the candidate host
//! - Reject paths that are not proxy paths (400)
//! - Reject hosts that are not allowlisted (403) before any I/O
//! - Build `https://{host}{path}{?query}`
//!
//! # Design Decisions
//! - Scheme is always https; there is no scheme negotiation
//! - Query string is carried over byte-for-byte
//! - Empty path segments are dropped, so `//proxy//h//x` resolves like
//!   `/proxy/h/x`

use url::Url;

use crate::error::{ProxyError, ProxyResult};
use crate::routing::allowlist::Allowlist;

/// First path segment of every proxied request.
pub const PROXY_PREFIX: &str = "proxy";

/// Usage pattern reported on malformed paths.
pub const PROXY_USAGE: &str = "/proxy/{host}/{path}";

pub const PROXY_EXAMPLE_PATH: &str = "/proxy/clob.polymarket.com/markets";

/// Resolved upstream for one request. `host` is always allowlisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    host: String,
    path: String,
    query: Option<String>,
}

impl TargetDescriptor {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path with leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path plus `?query` when a query is present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Absolute upstream URL.
    pub fn url(&self) -> ProxyResult<Url> {
        let url = Url::parse(&format!("https://{}{}", self.host, self.path_and_query()))?;
        Ok(url)
    }
}

/// Resolve an inbound path and query against the allowlist.
pub fn resolve(path: &str, query: Option<&str>, allowlist: &Allowlist) -> ProxyResult<TargetDescriptor> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() < 2 || segments[0] != PROXY_PREFIX {
        return Err(ProxyError::InvalidFormat {
            allowed: allowlist.to_vec(),
        });
    }

    let host = segments[1];
    if !allowlist.contains(host) {
        return Err(ProxyError::HostNotAllowed {
            requested: host.to_string(),
            allowed: allowlist.to_vec(),
        });
    }

    Ok(TargetDescriptor {
        host: host.to_string(),
        path: format!("/{}", segments[2..].join("/")),
        query: query.filter(|q| !q.is_empty()).map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Allowlist {
        Allowlist::new([
            "clob.polymarket.com",
            "gamma-api.polymarket.com",
            "polymarket.com",
        ])
    }

    #[test]
    fn test_resolves_url_with_query() {
        for host in allowlist().hosts() {
            let target = resolve(&format!("/proxy/{host}/markets"), Some("x=1"), &allowlist()).unwrap();
            assert_eq!(target.host(), host);
            assert_eq!(target.url().unwrap().as_str(), format!("https://{host}/markets?x=1"));
        }
    }

    #[test]
    fn test_host_only_maps_to_root() {
        let target = resolve("/proxy/polymarket.com", None, &allowlist()).unwrap();
        assert_eq!(target.path(), "/");
        assert_eq!(target.url().unwrap().as_str(), "https://polymarket.com/");
    }

    #[test]
    fn test_empty_segments_dropped() {
        let target = resolve("//proxy//clob.polymarket.com//prices//history/", None, &allowlist()).unwrap();
        assert_eq!(target.path(), "/prices/history");
    }

    #[test]
    fn test_query_preserved_verbatim() {
        let target = resolve(
            "/proxy/gamma-api.polymarket.com/events",
            Some("tag=a%20b&limit=10&tag=c"),
            &allowlist(),
        )
        .unwrap();
        assert_eq!(target.path_and_query(), "/events?tag=a%20b&limit=10&tag=c");
    }

    #[test]
    fn test_empty_query_dropped() {
        let target = resolve("/proxy/polymarket.com/x", Some(""), &allowlist()).unwrap();
        assert_eq!(target.query(), None);
        assert_eq!(target.url().unwrap().as_str(), "https://polymarket.com/x");
    }

    #[test]
    fn test_invalid_format() {
        for path in ["/", "/proxy", "/proxy/", "/api/polymarket.com/x", "/PROXY/polymarket.com/x"] {
            let err = resolve(path, None, &allowlist()).unwrap_err();
            assert!(matches!(err, ProxyError::InvalidFormat { .. }), "{path}");
        }
    }

    #[test]
    fn test_host_not_allowed() {
        for host in ["evil.com", "POLYMARKET.COM", "polymarket.com.evil.com", "127.0.0.1"] {
            match resolve(&format!("/proxy/{host}/x"), None, &allowlist()) {
                Err(ProxyError::HostNotAllowed { requested, allowed }) => {
                    assert_eq!(requested, host);
                    assert_eq!(allowed.len(), 3);
                }
                other => panic!("expected host-not-allowed for {host}, got {other:?}"),
            }
        }
    }
}

//! Request classification.
//!
//! Priority: `OPTIONS` on any path is a preflight, then `/` and `/health`,
//! then everything else goes to target resolution.

use axum::http::Method;

pub const HEALTH_PATHS: &[&str] = &["/", "/health"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Preflight,
    Health,
    Proxy,
}

impl RouteKind {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Preflight => "preflight",
            RouteKind::Health => "health",
            RouteKind::Proxy => "proxy",
        }
    }
}

pub fn classify(method: &Method, path: &str) -> RouteKind {
    if method == Method::OPTIONS {
        RouteKind::Preflight
    } else if HEALTH_PATHS.contains(&path) {
        RouteKind::Health
    } else {
        RouteKind::Proxy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_wins_everywhere() {
        for path in ["/", "/health", "/proxy/clob.polymarket.com/markets", "/nope"] {
            assert_eq!(classify(&Method::OPTIONS, path), RouteKind::Preflight);
        }
    }

    #[test]
    fn test_health_any_method() {
        for method in [Method::GET, Method::POST, Method::HEAD, Method::DELETE] {
            assert_eq!(classify(&method, "/"), RouteKind::Health);
            assert_eq!(classify(&method, "/health"), RouteKind::Health);
        }
    }

    #[test]
    fn test_everything_else_is_proxy() {
        assert_eq!(classify(&Method::GET, "/health/"), RouteKind::Proxy);
        assert_eq!(classify(&Method::GET, "/healthz"), RouteKind::Proxy);
        assert_eq!(classify(&Method::POST, "/proxy/polymarket.com/x"), RouteKind::Proxy);
    }
}

//! Upstream host allowlist.
//!
//! # Design Decisions
//! - Exact, case-sensitive string match; no suffix or wildcard matching
//! - Immutable after construction (thread-safe without locks)
//! - Preserves configured order for error reporting

/// Fixed set of upstream hosts the proxy may reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowlist {
    hosts: Vec<String>,
}

impl Allowlist {
    /// Build an allowlist, dropping duplicate entries.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for host in hosts {
            let host = host.into();
            if !unique.contains(&host) {
                unique.push(host);
            }
        }
        Self { hosts: unique }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.hosts.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

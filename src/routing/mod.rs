//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path + query
//!     → target.rs (split `/proxy/{host}/{rest...}`)
//!     → allowlist.rs (exact host check)
//!     → Return: TargetDescriptor or a 400/403 ProxyError
//! ```
//!
//! # Design Decisions
//! - Allowlist compiled at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same URL
//! - Rejection happens before any outbound I/O

pub mod allowlist;
pub mod target;

pub use allowlist::Allowlist;
pub use target::{resolve, TargetDescriptor};

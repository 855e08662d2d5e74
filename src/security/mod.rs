//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (shared-secret gate, when enabled)
//!     → [routing resolves the target]
//!     → headers.rs (exclusions, copy policy, impersonation overrides)
//!     → Pass to forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: a gated route without the right secret never reaches routing
//! - The gating header is never copied upstream
//! - No trust in client-supplied forwarding or platform headers

pub mod auth;
pub mod headers;

pub use auth::ApiKeyGate;
pub use headers::{AllowlistCopy, BlocklistCopy, CopyPolicy, Exclusions, HeaderPolicy};

//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! TargetDescriptor + outbound headers + body
//!     → forwarder.rs (single outbound call through an `Upstream`)
//!     → relay.rs (copy status/headers, overlay CORS + marker, stream body)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - `Upstream` is a trait so tests can observe outbound calls
//! - Upstream non-2xx answers are relayed, not turned into proxy errors
//! - Body is streamed through untouched

pub mod forwarder;
pub mod relay;

pub use forwarder::{ForwardError, OutboundRequest, ReqwestUpstream, Upstream, UpstreamResponse};
pub use relay::{relay, ProxyMarker};

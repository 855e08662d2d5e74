//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID, body read)
//!     → classifier.rs (preflight | health | proxy)
//!     → [security gate, routing, header policy, forwarder]
//!     → response.rs (preflight, health, CORS overlay)
//!     → Send to client
//! ```

pub mod classifier;
pub mod request;
pub mod response;
pub mod server;

pub use classifier::{classify, RouteKind};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};

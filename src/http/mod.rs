//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, base path)
//!     → request.rs (request ID, target extraction)
//!     → engine (validation, preflight)
//!     → client.rs (upstream fetch, redirect hops)
//!     → headers.rs (relay last hop, blacklist, CORS)
//!     → response.rs (dispatch to rewriters)
//!     → Send to client
//! ```

pub mod client;
pub mod headers;
pub mod landing;
pub mod request;
pub mod response;
pub mod server;

pub use client::{Forwarder, OutboundRequest, UpstreamResponse};
pub use headers::{relay_headers, HeaderBlock};
pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{dispatch, ResponseKind, RewrittenResponse};
pub use server::HttpServer;

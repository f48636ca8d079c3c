//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Split the proxy's base path off the request target
//! - Capture what the engine needs from the client request
//!
//! # Design Decisions
//! - The target is taken verbatim from the raw path and query, so encoded
//!   characters and nested `//` reach the validator untouched
//! - Request ID added as early as possible for tracing

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::routing::ProxyPrefix;

/// Standard request ID header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A client request, as seen by the proxy engine.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Everything after the proxy's base path, e.g. `http://example.net/page?q=1`.
    pub target: String,
    pub prefix: ProxyPrefix,
}

/// Remove `base_path` and its separating slash from a raw path and query.
///
/// Returns `None` when the request is not under `base_path`. A bare base path,
/// or one followed only by a query, yields the empty target.
pub fn extract_target<'a>(path_and_query: &'a str, base_path: &str) -> Option<&'a str> {
    let rest = path_and_query.strip_prefix(base_path.trim_end_matches('/'))?;
    let rest = match rest.strip_prefix('/') {
        Some(rest) => rest,
        None if rest.is_empty() || rest.starts_with('?') => "",
        None => return None,
    };
    if rest.starts_with('?') {
        Some("")
    } else {
        Some(rest)
    }
}

/// Request ID generator backed by random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

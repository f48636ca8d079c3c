//! Response dispatch.
//!
//! # Responsibilities
//! - Classify the fetched body by its Content-Type
//! - Route HTML and CSS through the rewriters, pass everything else through
//! - Attach the relayed upstream headers to the client response
//!
//! # Design Decisions
//! - Classification is a case-insensitive substring match, as browsers are lax
//!   about parameters and casing
//! - Only passthrough bodies advertise a Content-Length; rewritten bodies are
//!   sized by the server
//! - A rewriter failure degrades to the unmodified body rather than an error

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::client::UpstreamResponse;
use crate::http::headers::relay_headers;
use crate::rewrite::{proxify_css, proxify_html};
use crate::routing::{ProxyPrefix, TargetUrl};

/// How a response body was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Html,
    Css,
    Passthrough,
    Landing,
    Preflight,
}

impl ResponseKind {
    /// Classify an upstream Content-Type header value.
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("text/html") {
            ResponseKind::Html
        } else if content_type.contains("text/css") {
            ResponseKind::Css
        } else {
            ResponseKind::Passthrough
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Html => "html",
            ResponseKind::Css => "css",
            ResponseKind::Passthrough => "passthrough",
            ResponseKind::Landing => "landing",
            ResponseKind::Preflight => "preflight",
        }
    }
}

/// A response ready to be written to the client.
#[derive(Debug)]
pub struct RewrittenResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl RewrittenResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>, kind: ResponseKind) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            kind,
        }
    }
}

impl IntoResponse for RewrittenResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Turn a fetched upstream response into the client response.
pub fn dispatch(
    upstream: UpstreamResponse,
    target: &TargetUrl,
    prefix: &ProxyPrefix,
    cors: bool,
) -> RewrittenResponse {
    let mut headers = relay_headers(&upstream.hops, cors);
    let kind = ResponseKind::from_content_type(&upstream.content_type);

    let body = match kind {
        ResponseKind::Html => match proxify_html(&upstream.body, target, prefix) {
            Ok(html) => Bytes::from(html),
            Err(e) => {
                tracing::warn!(url = %target, error = %e, "HTML rewriting failed, relaying original body");
                upstream.body
            }
        },
        ResponseKind::Css => {
            let css = String::from_utf8_lossy(&upstream.body);
            Bytes::from(proxify_css(&css, target.as_str(), prefix))
        }
        _ => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(upstream.body.len()));
            upstream.body
        }
    };

    tracing::debug!(
        url = %target,
        kind = kind.as_str(),
        bytes = body.len(),
        "Dispatched upstream response"
    );

    RewrittenResponse::new(upstream.status, headers, body, kind)
}

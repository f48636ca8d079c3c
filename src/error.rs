//! Error types for the proxy.
//!
//! `ProxyError` covers everything that can abort a single proxied request and
//! renders itself as a plain-text response. `StartupError` covers failures
//! while wiring the server together.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Fatal conditions for a proxied request.
///
/// Every variant aborts before any response bytes are written.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Error: Detected a \"{0}\" URL. This proxy exclusively supports http and https URLs.")]
    UnsupportedScheme(String),

    #[error("Error: \"{0}\" is not a valid URL.")]
    InvalidUrl(String),

    #[error("Error: The requested URL was disallowed by the server administrator.")]
    WhitelistRejected,

    #[error("Error: The request body could not be read: {0}")]
    RequestBody(String),

    #[error("Error: The upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error: The upstream server responded with status {0}.")]
    UpstreamStatus(u16),

    #[error("Error: Gave up after following {0} redirects.")]
    TooManyRedirects(usize),
}

impl ProxyError {
    /// Status code sent to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UnsupportedScheme(_) | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::WhitelistRejected => StatusCode::FORBIDDEN,
            ProxyError::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Transport(_)
            | ProxyError::UpstreamStatus(_)
            | ProxyError::TooManyRedirects(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Failures while building the server from a validated configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid whitelist pattern: {0}")]
    Whitelist(#[from] regex::Error),

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

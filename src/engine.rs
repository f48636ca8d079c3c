//! The proxy pipeline for one inbound request.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → routing::parse_target (landing | validated TargetUrl | error)
//!     → CORS preflight short-circuit
//!     → http::client::Forwarder (hops + body)
//!     → http::response::dispatch (relay headers, rewrite body)
//!     → RewrittenResponse
//! ```

use axum::body::Bytes;
use axum::http::{Method, StatusCode};

use crate::config::{CorsConfig, ProxyConfig};
use crate::error::{ProxyError, StartupError};
use crate::http::client::{Forwarder, OutboundRequest};
use crate::http::headers::preflight_headers;
use crate::http::landing::landing_page;
use crate::http::request::InboundRequest;
use crate::http::response::{dispatch, ResponseKind, RewrittenResponse};
use crate::routing::{parse_target, Target, Whitelist};

/// Immutable per-process proxy state, shared by all requests.
#[derive(Debug)]
pub struct ProxyEngine {
    whitelist: Whitelist,
    cors: CorsConfig,
    forwarder: Forwarder,
    fallback_user_agent: String,
}

impl ProxyEngine {
    pub fn new(config: &ProxyConfig) -> Result<Self, StartupError> {
        let whitelist = Whitelist::from_config(&config.whitelist)?;
        let forwarder = Forwarder::new(&config.upstream, &config.timeouts)?;

        tracing::info!(
            allow_all = whitelist.is_empty(),
            whitelist_patterns = whitelist.len(),
            cors = config.cors.enabled,
            max_redirects = config.upstream.max_redirects,
            "Proxy engine initialized"
        );

        Ok(Self {
            whitelist,
            cors: config.cors.clone(),
            forwarder,
            fallback_user_agent: config.upstream.fallback_user_agent.clone(),
        })
    }

    /// Serve one request: landing page, preflight, or proxied content.
    pub async fn handle(&self, request: InboundRequest) -> Result<RewrittenResponse, ProxyError> {
        let target = match parse_target(&request.target, &self.whitelist)? {
            Target::Landing => return Ok(landing_page(&request.prefix)),
            Target::Url(target) => target,
        };

        if self.cors.enabled && request.method == Method::OPTIONS {
            tracing::debug!(url = %target, "Answering CORS preflight");
            return Ok(RewrittenResponse::new(
                StatusCode::OK,
                preflight_headers(&request.headers),
                Bytes::new(),
                ResponseKind::Preflight,
            ));
        }

        let outbound = OutboundRequest::mirror(
            request.method,
            target.clone(),
            &request.headers,
            request.body,
            &self.fallback_user_agent,
        );
        let upstream = self.forwarder.fetch(outbound).await?;

        if upstream.final_url.as_str() != target.as_str() {
            tracing::debug!(url = %target, final_url = %upstream.final_url, "Followed redirects");
        }

        Ok(dispatch(upstream, &target, &request.prefix, self.cors.enabled))
    }
}

//! Upstream transport.
//!
//! # Responsibilities
//! - Mirror the client's request headers and body to the target
//! - Follow redirects, recording every hop's response headers
//! - Map transport failures and error statuses onto `ProxyError`
//!
//! # Design Decisions
//! - `reqwest` follows redirects without exposing intermediate responses, so
//!   automatic redirects are disabled and hops are followed here instead
//! - Content negotiation and decompression are left to `reqwest`
//! - No retries: one logical fetch per inbound request

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use reqwest::{redirect, Client};
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::ProxyError;
use crate::http::headers::HeaderBlock;
use crate::observability::metrics;
use crate::routing::TargetUrl;

/// Request headers the transport sets itself.
const STRIPPED_REQUEST_HEADERS: [header::HeaderName; 4] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::ACCEPT_ENCODING,
    header::TRANSFER_ENCODING,
];

/// Request headers that only go to the origin the client asked for.
const ORIGIN_BOUND_HEADERS: [header::HeaderName; 2] = [header::AUTHORIZATION, header::COOKIE];

/// One logical request to the target.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: TargetUrl,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// Mirror an inbound request. Only POST and PUT carry a body.
    pub fn mirror(
        method: Method,
        url: TargetUrl,
        inbound_headers: &HeaderMap,
        body: Bytes,
        fallback_user_agent: &str,
    ) -> Self {
        let mut headers = inbound_headers.clone();
        for name in &STRIPPED_REQUEST_HEADERS {
            headers.remove(name);
        }

        let has_user_agent = headers
            .get(header::USER_AGENT)
            .is_some_and(|ua| !ua.is_empty());
        if !has_user_agent {
            match HeaderValue::from_str(fallback_user_agent) {
                Ok(ua) => {
                    headers.insert(header::USER_AGENT, ua);
                }
                Err(_) => tracing::warn!("Fallback user agent is not a valid header value"),
            }
        }

        let body = matches!(method, Method::POST | Method::PUT).then_some(body);

        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

/// Everything the transport learned from one logical fetch.
#[derive(Debug)]
pub struct UpstreamResponse {
    /// Response headers of every hop, redirects first, final response last.
    pub hops: Vec<HeaderBlock>,
    pub status: StatusCode,
    pub content_type: String,
    pub final_url: Url,
    pub body: Bytes,
}

/// HTTP client used to reach targets.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    max_redirects: usize,
}

impl Forwarder {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            max_redirects: upstream.max_redirects,
        })
    }

    /// Perform the request, following redirects.
    pub async fn fetch(&self, request: OutboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let origin = Url::parse(request.url.as_str())
            .map_err(|_| ProxyError::InvalidUrl(request.url.to_string()))?;

        let mut url = origin.clone();
        let mut method = request.method;
        let mut headers = request.headers;
        let mut body = request.body;
        let mut hops = Vec::new();

        loop {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await?;
            let status = response.status();
            let hop = HeaderBlock::from_response(response.version(), status, response.headers());

            tracing::debug!(
                url = %url,
                status = hop.status_line(),
                hop = hops.len() + 1,
                "Upstream hop"
            );

            let location = status
                .is_redirection()
                .then(|| hop.get(header::LOCATION.as_str()))
                .flatten()
                .and_then(|v| url.join(v).ok());
            let content_type = hop
                .get(header::CONTENT_TYPE.as_str())
                .unwrap_or("")
                .to_string();
            hops.push(hop);

            if let Some(next) = location {
                if hops.len() > self.max_redirects {
                    return Err(ProxyError::TooManyRedirects(self.max_redirects));
                }
                if !matches!(next.scheme(), "http" | "https") {
                    return Err(ProxyError::UnsupportedScheme(next.scheme().to_string()));
                }
                if redirect_drops_body(status, &method) {
                    method = Method::GET;
                    body = None;
                }
                if next.origin() != origin.origin() {
                    for name in &ORIGIN_BOUND_HEADERS {
                        headers.remove(name);
                    }
                }
                url = next;
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                return Err(ProxyError::UpstreamStatus(status.as_u16()));
            }

            let body = response.bytes().await?;

            metrics::record_upstream_hops(hops.len());

            return Ok(UpstreamResponse {
                hops,
                status,
                content_type,
                final_url: url,
                body,
            });
        }
    }
}

/// Whether following this redirect turns the request into a bodiless GET.
fn redirect_drops_body(status: StatusCode, method: &Method) -> bool {
    match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => *method == Method::POST,
        StatusCode::SEE_OTHER => *method != Method::HEAD && *method != Method::GET,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{parse_target, Target, Whitelist};

    fn target() -> TargetUrl {
        match parse_target("http://a.test/", &Whitelist::default()).unwrap() {
            Target::Url(url) => url,
            Target::Landing => unreachable!(),
        }
    }

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.test"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("3"));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        headers
    }

    #[test]
    fn test_mirror_strips_transport_headers() {
        let request = OutboundRequest::mirror(
            Method::GET,
            target(),
            &inbound(),
            Bytes::from_static(b"abc"),
            "fallback/1.0",
        );

        assert!(request.headers.get(header::HOST).is_none());
        assert!(request.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(request.headers.get(header::ACCEPT_ENCODING).is_none());
        assert_eq!(request.headers.get(header::ACCEPT_LANGUAGE).unwrap(), "en");
        assert_eq!(request.headers.get(header::USER_AGENT).unwrap(), "fallback/1.0");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_mirror_keeps_client_user_agent() {
        let mut headers = inbound();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Browser/2.0"));

        let request = OutboundRequest::mirror(Method::GET, target(), &headers, Bytes::new(), "fallback/1.0");
        assert_eq!(request.headers.get(header::USER_AGENT).unwrap(), "Browser/2.0");
    }

    #[test]
    fn test_body_only_for_post_and_put() {
        let body = Bytes::from_static(b"payload");
        for (method, expected) in [
            (Method::POST, true),
            (Method::PUT, true),
            (Method::GET, false),
            (Method::HEAD, false),
            (Method::DELETE, false),
        ] {
            let request =
                OutboundRequest::mirror(method.clone(), target(), &inbound(), body.clone(), "ua");
            assert_eq!(request.body.is_some(), expected, "{method}");
        }
    }

    #[test]
    fn test_redirect_method_rewrite() {
        assert!(redirect_drops_body(StatusCode::FOUND, &Method::POST));
        assert!(redirect_drops_body(StatusCode::MOVED_PERMANENTLY, &Method::POST));
        assert!(!redirect_drops_body(StatusCode::FOUND, &Method::PUT));
        assert!(redirect_drops_body(StatusCode::SEE_OTHER, &Method::PUT));
        assert!(!redirect_drops_body(StatusCode::SEE_OTHER, &Method::HEAD));
        assert!(!redirect_drops_body(StatusCode::TEMPORARY_REDIRECT, &Method::POST));
        assert!(!redirect_drops_body(StatusCode::PERMANENT_REDIRECT, &Method::POST));
    }
}

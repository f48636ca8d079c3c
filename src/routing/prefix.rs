//! The proxy's own base URL.

use std::fmt;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap};

/// Absolute base URL of this proxy, always ending in `/`.
///
/// Prepended to every absolute target URL written into rewritten content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPrefix(String);

impl ProxyPrefix {
    /// Build from an origin (`scheme://host[:port]`) and a base path.
    pub fn new(origin: &str, base_path: &str) -> Self {
        Self(format!(
            "{}{}/",
            origin.trim_end_matches('/'),
            base_path.trim_end_matches('/')
        ))
    }

    /// Derive the prefix for one inbound request.
    ///
    /// A configured public URL wins. Otherwise the scheme comes from
    /// `X-Forwarded-Proto` and the host from the `Host` header, falling back
    /// to the listener's own address.
    pub fn for_request(
        headers: &HeaderMap,
        public_url: Option<&str>,
        base_path: &str,
        local_addr: SocketAddr,
    ) -> Self {
        if let Some(public_url) = public_url {
            return Self::new(public_url, base_path);
        }

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|v| v == "http" || v == "https")
            .unwrap_or_else(|| "http".to_string());

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if local_addr.port() == 80 {
                    local_addr.ip().to_string()
                } else {
                    local_addr.to_string()
                }
            });

        Self::new(&format!("{scheme}://{host}"), base_path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Route an absolute URL back through the proxy.
    pub fn proxify(&self, absolute: &str) -> String {
        format!("{}{}", self.0, absolute)
    }
}

impl fmt::Display for ProxyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn local() -> SocketAddr {
        "10.0.0.5:8080".parse().unwrap()
    }

    #[test]
    fn test_prefix_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.test:8080"));

        let prefix = ProxyPrefix::for_request(&headers, None, "", local());
        assert_eq!(prefix.as_str(), "http://proxy.test:8080/");

        let prefix = ProxyPrefix::for_request(&headers, None, "/p", local());
        assert_eq!(prefix.as_str(), "http://proxy.test:8080/p/");
    }

    #[test]
    fn test_prefix_honors_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.test"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));

        let prefix = ProxyPrefix::for_request(&headers, None, "", local());
        assert_eq!(prefix.as_str(), "https://proxy.test/");
    }

    #[test]
    fn test_prefix_falls_back_to_local_address() {
        let prefix = ProxyPrefix::for_request(&HeaderMap::new(), None, "", local());
        assert_eq!(prefix.as_str(), "http://10.0.0.5:8080/");

        let port_80: SocketAddr = "10.0.0.5:80".parse().unwrap();
        let prefix = ProxyPrefix::for_request(&HeaderMap::new(), None, "", port_80);
        assert_eq!(prefix.as_str(), "http://10.0.0.5/");
    }

    #[test]
    fn test_public_url_overrides_request() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));

        let prefix =
            ProxyPrefix::for_request(&headers, Some("https://proxy.example/"), "/go", local());
        assert_eq!(prefix.as_str(), "https://proxy.example/go/");
    }

    #[test]
    fn test_proxify() {
        let prefix = ProxyPrefix::new("http://proxy.test", "");
        assert_eq!(
            prefix.proxify("http://a.test/x"),
            "http://proxy.test/http://a.test/x"
        );
    }
}

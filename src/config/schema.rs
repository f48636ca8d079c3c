//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public address, compression).
    pub listener: ListenerConfig,

    /// Which target URLs may be proxied.
    pub whitelist: WhitelistConfig,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    /// Outbound request settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path the proxy is mounted under, without trailing slash.
    /// Empty means the server root.
    pub base_path: String,

    /// Externally visible base URL (e.g., "https://proxy.example").
    /// When unset the proxy prefix is derived from each request's Host header.
    pub public_url: Option<String>,

    /// Gzip the final output when the client accepts it.
    pub compress_responses: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            base_path: String::new(),
            public_url: None,
            compress_responses: true,
        }
    }
}

/// Whitelist configuration. Both lists empty means every URL is allowed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Regular expressions matched against the full target URL.
    pub patterns: Vec<String>,

    /// Bare hostnames; each allows http(s) URLs on the host and its subdomains.
    pub hostnames: Vec<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Force permissive CORS headers on every proxied response.
    pub enabled: bool,
}

/// Outbound request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// User agent sent when the client did not provide one.
    pub fallback_user_agent: String,

    /// Maximum redirect hops followed for a single request.
    pub max_redirects: usize,

    /// Maximum inbound request body forwarded upstream, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            fallback_user_agent: "Mozilla/5.0 (compatible; rewrite-proxy)".to_string(),
            max_redirects: 20,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Configuration validation.
//!
//! Serde handles syntax; this module checks values: addresses parse, the
//! base path has the right shape, whitelist patterns compile.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("base path '{0}' must start with '/' and must not end with '/'")]
    BasePath(String),

    #[error("public url '{0}' must be an absolute http or https URL")]
    PublicUrl(String),

    #[error("whitelist pattern '{pattern}' is invalid: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("whitelist hostname '{0}' must be a bare hostname")]
    Hostname(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(listener.bind_address.clone()));
    }

    let base = &listener.base_path;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::BasePath(base.clone()));
    }

    if let Some(public_url) = &listener.public_url {
        let valid = Url::parse(public_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::PublicUrl(public_url.clone()));
        }
    }

    for pattern in &config.whitelist.patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ValidationError::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    for hostname in &config.whitelist.hostnames {
        if hostname.is_empty() || hostname.contains("://") || hostname.contains('/') {
            errors.push(ValidationError::Hostname(hostname.clone()));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.upstream.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("upstream.max_body_bytes"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Target URL extraction and validation.
//!
//! # Responsibilities
//! - Recognize the landing request (no target at all)
//! - Repair `scheme:/host` paths where an intermediary collapsed `//`
//! - Default missing schemes to http, reject anything but http(s)
//! - Enforce the whitelist

use std::borrow::Cow;
use std::fmt;

use url::Url;

use crate::error::ProxyError;
use crate::rewrite::resolve::scheme_of;
use crate::routing::whitelist::Whitelist;

/// An absolute http or https URL the proxy has agreed to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(String);

impl TargetUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of validating the path remainder of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Nothing after the proxy's base path; serve the landing page.
    Landing,
    /// A URL to proxy.
    Url(TargetUrl),
}

/// Normalize and validate the raw target taken from the request path.
pub fn parse_target(raw: &str, whitelist: &Whitelist) -> Result<Target, ProxyError> {
    if raw.is_empty() {
        return Ok(Target::Landing);
    }

    let mut url = restore_double_slash(raw).into_owned();

    let scheme = scheme_of(&url).map(str::to_ascii_lowercase);
    match scheme.as_deref() {
        Some("http") | Some("https") => {}
        Some(_) => {
            let original = scheme_of(&url).unwrap_or_default().to_string();
            return Err(ProxyError::UnsupportedScheme(original));
        }
        None if url.starts_with("//") => url.insert_str(0, "http:"),
        None => url.insert_str(0, "http://"),
    }

    let has_host = Url::parse(&url)
        .map(|parsed| parsed.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false);
    if !has_host {
        return Err(ProxyError::InvalidUrl(url));
    }

    if !whitelist.allows(&url) {
        tracing::info!(url = %url, "Target rejected by whitelist");
        return Err(ProxyError::WhitelistRejected);
    }

    Ok(Target::Url(TargetUrl(url)))
}

/// Some servers collapse `//` in paths, turning `http://host` into `http:/host`.
fn restore_double_slash(raw: &str) -> Cow<'_, str> {
    match raw.find(":/") {
        Some(pos) if raw.find("://") != Some(pos) => {
            Cow::Owned(format!("{}://{}", &raw[..pos], &raw[pos + 2..]))
        }
        _ => Cow::Borrowed(raw),
    }
}

//! Upstream header blocks and the response header relay.
//!
//! # Responsibilities
//! - Represent one hop's response headers with case-insensitive lookup
//! - Split cURL-style concatenated header text into per-hop blocks
//! - Relay only the final hop's headers, minus the transport blacklist
//! - Add robots and CORS headers, answer CORS preflights
//!
//! # Design Decisions
//! - Content-Length, Transfer-Encoding and gzip Content-Encoding describe the
//!   upstream transfer, which rewriting invalidates; they are never relayed
//! - Injected headers replace same-named upstream headers

use std::sync::LazyLock;

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    },
    HeaderMap, HeaderName, HeaderValue, StatusCode, Version,
};
use regex::Regex;

pub const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");

static HEADER_BLACKLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Content-Length|^Transfer-Encoding|^Content-Encoding.*gzip")
        .expect("valid regex")
});

/// Response headers of a single hop, in received order.
///
/// Values are kept as raw bytes so they are relayed exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    status_line: String,
    lines: Vec<(String, Vec<u8>)>,
}

impl HeaderBlock {
    /// Parse one block of `Name: value` lines, optionally led by a status line.
    pub fn parse(block: &str) -> Self {
        let mut parsed = Self::default();
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with("HTTP/") && parsed.status_line.is_empty() && parsed.lines.is_empty() {
                parsed.status_line = line.to_string();
            } else if let Some((name, value)) = line.split_once(':') {
                parsed.push(name.trim(), value.trim().as_bytes());
            }
        }
        parsed
    }

    /// Snapshot the headers of a transport response.
    pub fn from_response(version: Version, status: StatusCode, headers: &HeaderMap) -> Self {
        let mut block = Self {
            status_line: format!("{version:?} {status}"),
            lines: Vec::with_capacity(headers.len()),
        };
        for (name, value) in headers {
            block.push(name.as_str(), value.as_bytes());
        }
        block
    }

    pub fn push(&mut self, name: &str, value: &[u8]) {
        self.lines.push((name.to_string(), value.to_vec()));
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// First value for `name`, compared case-insensitively, if it is valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| std::str::from_utf8(v).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.lines.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

/// Split concatenated header sections (one per hop) on their blank lines.
pub fn split_header_blocks(raw: &str) -> Vec<HeaderBlock> {
    raw.split("\r\n\r\n")
        .filter(|block| !block.trim().is_empty())
        .map(HeaderBlock::parse)
        .collect()
}

/// Whether a header must never be relayed to the client.
pub fn is_blacklisted(name: &str, value: &str) -> bool {
    HEADER_BLACKLIST.is_match(&format!("{name}: {value}"))
}

/// Build the client-facing headers from the hops of one upstream fetch.
///
/// Only the last hop counts; earlier hops are redirects the client never sees.
pub fn relay_headers(hops: &[HeaderBlock], cors: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(last) = hops.last() {
        for (name, value) in last.iter() {
            if is_blacklisted(name, &String::from_utf8_lossy(value)) {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!(header = %name, "Dropping unrepresentable upstream header"),
            }
        }
    }

    headers.insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex, nofollow"));
    if cors {
        apply_cors(&mut headers);
    }
    headers
}

/// Headers answering a CORS preflight without contacting the upstream.
pub fn preflight_headers(request: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex, nofollow"));
    apply_cors(&mut headers);

    if request.contains_key(ACCESS_CONTROL_REQUEST_METHOD) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
    }
    if let Some(requested) = request.get(ACCESS_CONTROL_REQUEST_HEADERS) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
    headers
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "HTTP/1.1 302 Found\r\nLocation: /new\r\nSet-Cookie: hop=1\r\n\r\n\
                       HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 42\r\n\
                       Set-Cookie: a=1\r\nset-cookie: b=2\r\nContent-Encoding: gzip\r\n\r\n";

    #[test]
    fn test_split_header_blocks() {
        let blocks = split_header_blocks(RAW);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].status_line(), "HTTP/1.1 302 Found");
        assert_eq!(blocks[0].get("location"), Some("/new"));
        assert_eq!(blocks[1].status_line(), "HTTP/1.1 200 OK");
        assert_eq!(blocks[1].iter().count(), 5);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let block = &split_header_blocks(RAW)[1];
        assert_eq!(block.get("CONTENT-TYPE"), Some("text/html"));
        let cookies: Vec<_> = block
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("Set-Cookie"))
            .map(|(_, value)| value)
            .collect();
        assert_eq!(cookies, vec![b"a=1".as_slice(), b"b=2".as_slice()]);
        assert_eq!(block.get("x-missing"), None);
    }

    #[test]
    fn test_blacklist() {
        assert!(is_blacklisted("Content-Length", "42"));
        assert!(is_blacklisted("content-length", "42"));
        assert!(is_blacklisted("Transfer-Encoding", "chunked"));
        assert!(is_blacklisted("Content-Encoding", "gzip"));
        assert!(is_blacklisted("Content-Encoding", "x-GZIP"));
        assert!(!is_blacklisted("Content-Encoding", "br"));
        assert!(!is_blacklisted("Content-Type", "text/html"));
        assert!(!is_blacklisted("X-Content-Length", "1"));
    }

    #[test]
    fn test_relay_uses_last_block_only() {
        let headers = relay_headers(&split_header_blocks(RAW), false);

        assert!(headers.get("location").is_none());
        assert!(headers.get("content-length").is_none());
        assert!(headers.get("content-encoding").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "text/html");
        let cookies: Vec<_> = headers.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(headers.get("x-robots-tag").unwrap(), "noindex, nofollow");
        assert!(headers.get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_relay_forwards_values_verbatim() {
        let block = HeaderBlock::parse("Cache-Control: max-age=0,  no-store\r\nX-Odd: a;b=\"c\"");
        let headers = relay_headers(&[block], false);
        assert_eq!(headers.get("cache-control").unwrap(), "max-age=0,  no-store");
        assert_eq!(headers.get("x-odd").unwrap(), "a;b=\"c\"");
    }

    #[test]
    fn test_cors_overrides_upstream() {
        let block = HeaderBlock::parse(
            "Access-Control-Allow-Origin: https://site.test\r\nX-Robots-Tag: all",
        );
        let headers = relay_headers(&[block], true);

        let origins: Vec<_> = headers.get_all("access-control-allow-origin").iter().collect();
        assert_eq!(origins, vec!["*"]);
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
        assert_eq!(headers.get("x-robots-tag").unwrap(), "noindex, nofollow");
    }

    #[test]
    fn test_relay_without_hops() {
        let headers = relay_headers(&[], false);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_preflight_echoes_request() {
        let mut request = HeaderMap::new();
        request.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("PUT"));
        request.insert(
            ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("X-Custom, Content-Type"),
        );

        let headers = preflight_headers(&request);
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET, POST, OPTIONS");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "X-Custom, Content-Type");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");

        let bare = preflight_headers(&HeaderMap::new());
        assert!(bare.get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
        assert!(bare.get(ACCESS_CONTROL_ALLOW_HEADERS).is_none());
    }

    #[test]
    fn test_from_response_snapshot() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/css"));
        let block = HeaderBlock::from_response(Version::HTTP_11, StatusCode::OK, &headers);

        assert_eq!(block.status_line(), "HTTP/1.1 200 OK");
        assert_eq!(block.get("Content-Type"), Some("text/css"));
    }

    #[test]
    fn test_non_utf8_values_relayed_byte_for_byte() {
        let raw: &[u8] = b"attachment; filename=caf\xe9.txt";
        let mut headers = HeaderMap::new();
        headers.insert("content-disposition", HeaderValue::from_bytes(raw).unwrap());
        let block = HeaderBlock::from_response(Version::HTTP_11, StatusCode::OK, &headers);

        assert_eq!(block.get("content-disposition"), None);
        let relayed = relay_headers(&[block], false);
        assert_eq!(relayed.get("content-disposition").unwrap().as_bytes(), raw);
    }

    #[test]
    fn test_blacklist_applies_to_non_utf8_values() {
        let mut block = HeaderBlock::default();
        block.push("Content-Encoding", b"gzip\xff");
        block.push("X-Keep", b"ok");

        let relayed = relay_headers(&[block], false);
        assert!(relayed.get("content-encoding").is_none());
        assert_eq!(relayed.get("x-keep").unwrap(), "ok");
    }
}

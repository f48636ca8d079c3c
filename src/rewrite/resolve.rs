//! Relative to absolute URL resolution.
//!
//! The algorithm is deliberately simple and string based so that the
//! browser-side copy in `script.rs` produces identical results:
//!
//! 1. empty reference means `.`
//! 2. references with a scheme, or starting with `//`, are returned as is
//! 3. `#fragment` and `?query` references are appended to the base verbatim
//! 4. otherwise the reference is joined to the base's directory (or root,
//!    for `/path` references) and dot segments are collapsed

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// `//`, `/./`, or a trailing `/.`
static EMPTY_OR_DOT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\.?(?:/|$)").expect("valid regex"));

/// `/segment/../` or a trailing `/segment/..`
static PARENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]+)/\.\.(?:/|$)").expect("valid regex"));

/// Scheme of `reference`, if it has one.
///
/// `host:8080/path` names a port rather than a scheme and yields `None`.
pub fn scheme_of(reference: &str) -> Option<&str> {
    let colon = reference.find(':')?;
    let scheme = &reference[..colon];

    let mut chars = scheme.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }

    let rest = &reference[colon + 1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && (digits == rest.len() || rest.as_bytes()[digits] == b'/') {
        return None;
    }

    Some(scheme)
}

/// Resolve `relative` against the absolute URL `base`.
///
/// If `base` cannot be parsed the reference is returned unchanged.
pub fn resolve(relative: &str, base: &str) -> String {
    let relative = if relative.is_empty() { "." } else { relative };

    if scheme_of(relative).is_some() || relative.starts_with("//") {
        return relative.to_string();
    }
    if relative.starts_with('#') || relative.starts_with('?') {
        return format!("{base}{relative}");
    }

    let Ok(base_url) = Url::parse(base) else {
        return relative.to_string();
    };

    let directory = if relative.starts_with('/') {
        ""
    } else {
        base_url
            .path()
            .rsplit_once('/')
            .map(|(directory, _file)| directory)
            .unwrap_or("")
    };

    let userinfo = match (base_url.username(), base_url.password()) {
        ("", None) => String::new(),
        (user, None) => format!("{user}@"),
        (user, Some(password)) => format!("{user}:{password}@"),
    };
    let host = base_url.host_str().unwrap_or("");
    let port = match base_url.port() {
        Some(port) if port != 80 => format!(":{port}"),
        _ => String::new(),
    };

    let joined = format!("{userinfo}{host}{port}{directory}/{relative}");
    format!("{}://{}", base_url.scheme(), collapse_segments(joined))
}

/// Remove `//`, `/./` and `/segment/../` until nothing changes.
/// A segment at the very end counts as if followed by `/`.
fn collapse_segments(mut path: String) -> String {
    loop {
        let reduced = {
            let pass = EMPTY_OR_DOT_SEGMENT.replace_all(&path, "/");
            PARENT_SEGMENT
                .replace_all(&pass, |caps: &Captures<'_>| {
                    // `..` segments are never the thing being removed
                    if caps[1].starts_with("..") {
                        caps[0].to_string()
                    } else {
                        "/".to_string()
                    }
                })
                .into_owned()
        };
        if reduced == path {
            return path;
        }
        path = reduced;
    }
}

//! `url(...)` rewriting for stylesheets, `<style>` blocks and `style` attributes.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::rewrite::{resolve::resolve, starts_with_ignore_case};
use crate::routing::ProxyPrefix;

static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)url\((.*?)\)").expect("valid regex"));

/// Point every `url(...)` reference in `css` back through the proxy.
///
/// `data:` URLs are left exactly as written.
pub fn proxify_css(css: &str, base: &str, prefix: &ProxyPrefix) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures<'_>| {
            let value = unquote(caps[1].trim());
            if starts_with_ignore_case(value, "data:") {
                return caps[0].to_string();
            }
            format!("url({})", prefix.proxify(&resolve(value, base)))
        })
        .into_owned()
}

/// Strip one layer of matching single or double quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

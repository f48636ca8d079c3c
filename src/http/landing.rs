//! Landing page served when no target URL is given.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::http::headers::X_ROBOTS_TAG;
use crate::http::response::{ResponseKind, RewrittenResponse};
use crate::routing::ProxyPrefix;

/// Instructional page with an example link and a URL form.
pub fn landing_page(prefix: &ProxyPrefix) -> RewrittenResponse {
    let href = escape_html(prefix.as_str());
    let example = escape_html(&prefix.proxify("http://example.net/"));
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>rewrite-proxy</title>
</head>
<body>
<h1>Welcome to rewrite-proxy!</h1>
<p>rewrite-proxy fetches pages on your behalf and rewrites their links, forms and
resources so that browsing continues through the proxy.</p>
<p>To browse a site, append its URL to this page's address, e.g.
<a href="{example}">{example}</a></p>
<form onsubmit="window.location.href = this.getAttribute('data-prefix') + document.getElementById('site').value; return false;" data-prefix="{href}">
<input id="site" type="text" size="50" placeholder="http://example.net/">
<input type="submit" value="Proxy It!">
</form>
</body>
</html>
"#
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex, nofollow"));

    RewrittenResponse::new(StatusCode::OK, headers, body, ResponseKind::Landing)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

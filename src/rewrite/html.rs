//! HTML rewriting.
//!
//! Runs `lol_html` over the fetched page so that forms, links, embedded
//! resources and inline styles point back through the proxy, and injects the
//! AJAX interception script. The parser is tolerant: malformed markup is
//! rewritten on a best-effort basis rather than rejected.
//!
//! Attribute values are read with character references decoded, the way a
//! browser sees them, and escaped again when written back.

use std::cell::Cell;

use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, Element};
use lol_html::{element, text, HandlerResult, HtmlRewriter, Settings};

use crate::rewrite::{
    css::proxify_css, resolve::resolve, script::interception_script, starts_with_ignore_case,
};
use crate::routing::{ProxyPrefix, TargetUrl};

/// Written ahead of every rewritten page.
pub const BANNER: &str = "<!-- Proxified page constructed by rewrite-proxy -->\n";

/// Rewrite an HTML document fetched from `target`.
pub fn proxify_html(
    html: &[u8],
    target: &TargetUrl,
    prefix: &ProxyPrefix,
) -> Result<Vec<u8>, RewritingError> {
    let base = target.as_str();
    let script = interception_script(target, prefix);
    let script_inserted = Cell::new(false);
    let mut style_text = String::new();

    let mut output = Vec::with_capacity(BANNER.len() + html.len() + script.len());
    output.extend_from_slice(BANNER.as_bytes());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("form", |el| {
                    let action = match decoded_attribute(el, "action") {
                        Some(action) if !action.is_empty() => resolve(&action, base),
                        _ => base.to_string(),
                    };
                    set_encoded_attribute(el, "action", &prefix.proxify(&action))
                }),
                text!("style", |chunk| {
                    // Chunks of one text node are gathered and rewritten together
                    style_text.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        let css = proxify_css(&std::mem::take(&mut style_text), base, prefix);
                        chunk.replace(&css, ContentType::Html);
                    } else {
                        chunk.remove();
                    }
                    Ok(())
                }),
                element!("*[style]", |el| {
                    match decoded_attribute(el, "style") {
                        Some(style) => {
                            set_encoded_attribute(el, "style", &proxify_css(&style, base, prefix))
                        }
                        None => Ok(()),
                    }
                }),
                element!("*[href]", |el| proxify_reference(el, "href", base, prefix)),
                element!("*[src]", |el| proxify_reference(el, "src", base, prefix)),
                element!("head", |el| {
                    if !script_inserted.replace(true) {
                        el.prepend(&script, ContentType::Html);
                    }
                    Ok(())
                }),
                element!("body", |el| {
                    if !script_inserted.replace(true) {
                        el.prepend(&script, ContentType::Html);
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter.write(html)?;
    rewriter.end()?;
    Ok(output)
}

/// Resolve and prefix one `href`/`src` attribute unless it must stay as written.
fn proxify_reference(
    el: &mut Element<'_, '_>,
    name: &str,
    base: &str,
    prefix: &ProxyPrefix,
) -> HandlerResult {
    let Some(value) = decoded_attribute(el, name) else {
        return Ok(());
    };
    if is_inert_reference(name, &value) {
        return Ok(());
    }
    set_encoded_attribute(el, name, &prefix.proxify(&resolve(&value, base)))
}

fn decoded_attribute(el: &Element<'_, '_>, name: &str) -> Option<String> {
    el.get_attribute(name)
        .map(|raw| decode_html_entities(&raw).into_owned())
}

fn set_encoded_attribute(el: &mut Element<'_, '_>, name: &str, value: &str) -> HandlerResult {
    el.set_attribute(name, &encode_double_quoted_attribute(value))?;
    Ok(())
}

fn is_inert_reference(name: &str, value: &str) -> bool {
    let value = value.trim_start();
    starts_with_ignore_case(value, "data:")
        || (name == "href"
            && (starts_with_ignore_case(value, "javascript:")
                || starts_with_ignore_case(value, "mailto:")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{parse_target, Target, Whitelist};

    const PREFIX: &str = "http://proxy.test/";

    fn rewrite(html: &str, target: &str) -> String {
        let target = match parse_target(target, &Whitelist::default()).unwrap() {
            Target::Url(url) => url,
            Target::Landing => unreachable!(),
        };
        let prefix = ProxyPrefix::new("http://proxy.test", "");
        String::from_utf8(proxify_html(html.as_bytes(), &target, &prefix).unwrap()).unwrap()
    }

    #[test]
    fn test_links_are_proxified() {
        let out = rewrite(
            r#"<html><body><a href="/x">x</a><img src="img/p.png"></body></html>"#,
            "http://example.test/dir/page.html",
        );
        assert!(out.contains(&format!(r#"<a href="{PREFIX}http://example.test/x">"#)));
        assert!(out.contains(&format!(r#"<img src="{PREFIX}http://example.test/dir/img/p.png">"#)));
    }

    #[test]
    fn test_inert_references_untouched() {
        let out = rewrite(
            r#"<body><a href="javascript:void(0)">j</a><a href="MAILTO:me@a.test">m</a><img src="data:image/gif;base64,R0l="></body>"#,
            "http://example.test/",
        );
        assert!(out.contains(r#"<a href="javascript:void(0)">"#));
        assert!(out.contains(r#"<a href="MAILTO:me@a.test">"#));
        assert!(out.contains(r#"<img src="data:image/gif;base64,R0l=">"#));
    }

    #[test]
    fn test_character_references_decoded_before_rewriting() {
        let out = rewrite(
            r#"<body><div style="background:url(&quot;/a.png&quot;)"></div><a href="/s?a=1&amp;b=2">s</a></body>"#,
            "http://example.test/dir/page",
        );
        assert!(out.contains(&format!(
            r#"<div style="background:url({PREFIX}http://example.test/a.png)">"#
        )));
        assert!(out.contains(&format!(
            r#"<a href="{PREFIX}http://example.test/s?a=1&amp;b=2">"#
        )));
    }

    #[test]
    fn test_encoded_inert_references_untouched() {
        let out = rewrite(
            r#"<body><a href="&#x6a;avascript:alert(1)">j</a><img src="&#100;ata:image/gif;base64,R0l="></body>"#,
            "http://example.test/",
        );
        assert!(out.contains(r#"<a href="&#x6a;avascript:alert(1)">"#));
        assert!(out.contains(r#"<img src="&#100;ata:image/gif;base64,R0l=">"#));
    }

    #[test]
    fn test_form_actions() {
        let out = rewrite(
            r#"<body><form action="search"></form><form method="post"></form></body>"#,
            "http://example.test/dir/page",
        );
        assert!(out.contains(&format!(r#"<form action="{PREFIX}http://example.test/dir/search">"#)));
        assert!(out.contains(&format!(
            r#"<form method="post" action="{PREFIX}http://example.test/dir/page">"#
        )));
    }

    #[test]
    fn test_styles_are_proxified() {
        let out = rewrite(
            r#"<head><style>body { background: url('/bg.png') }</style></head><body><div style="background:url(i.png)"></div></body>"#,
            "http://example.test/a/",
        );
        assert!(out.contains(&format!(
            "<style>body {{ background: url({PREFIX}http://example.test/bg.png) }}</style>"
        )));
        assert!(out.contains(&format!(
            r#"<div style="background:url({PREFIX}http://example.test/a/i.png)">"#
        )));
    }

    #[test]
    fn test_style_child_selectors_not_escaped() {
        let out = rewrite("<head><style>a > b { color: red }</style></head>", "http://example.test/");
        assert!(out.contains("<style>a > b { color: red }</style>"));
    }

    #[test]
    fn test_script_injected_into_head() {
        let out = rewrite(
            "<html><head><title>t</title></head><body><p>hi</p></body></html>",
            "http://example.test/",
        );
        assert!(out.starts_with(BANNER));
        assert!(out.contains("<head><script type=\"text/javascript\">"));
        assert_eq!(out.matches("<script").count(), 1);
    }

    #[test]
    fn test_script_falls_back_to_body() {
        let out = rewrite("<body><p>hi</p></body>", "http://example.test/");
        assert!(out.contains("<body><script type=\"text/javascript\">"));
    }

    #[test]
    fn test_script_omitted_without_head_or_body() {
        let out = rewrite("just some text mislabeled as html", "http://example.test/");
        assert_eq!(out, format!("{BANNER}just some text mislabeled as html"));
    }

    #[test]
    fn test_malformed_markup_tolerated() {
        let out = rewrite(r#"<body><a href="/x"><div <p>"#, "http://example.test/");
        assert!(out.contains(&format!(r#"href="{PREFIX}http://example.test/x""#)));
    }
}

//! Browser-side AJAX interception.
//!
//! The injected script wraps `XMLHttpRequest.prototype.open` so that request
//! URLs built by page scripts are resolved against the target page and routed
//! through the proxy. Its `rel2abs` mirrors [`crate::rewrite::resolve::resolve`].

use crate::routing::{ProxyPrefix, TargetUrl};

const SCRIPT_OPEN: &str = "(function() {\n";

const SCRIPT_BODY: &str = r##"
  if (!window.XMLHttpRequest) {
    return;
  }

  function rel2abs(rel, base) {
    if (!rel) {
      rel = ".";
    }
    if (/^[a-z][a-z0-9+.\-]*:(?!\d+(\/|$))/i.test(rel) || rel.indexOf("//") === 0) {
      return rel;
    }
    if (rel.charAt(0) === "#" || rel.charAt(0) === "?") {
      return base + rel;
    }
    var m = /^([a-z][a-z0-9+.\-]*):\/\/(?:([^@\/?#]*)@)?(\[[^\]]*\]|[^:\/?#]*)(?::(\d*))?([^?#]*)/i.exec(base);
    if (!m) {
      return rel;
    }
    var auth = m[2] !== undefined ? m[2] + "@" : "";
    var port = m[4] && m[4] !== "80" ? ":" + m[4] : "";
    var dir = rel.charAt(0) === "/" ? "" : m[5].replace(/\/[^\/]*$/, "");
    var abs = auth + m[3] + port + dir + "/" + rel;
    var previous;
    do {
      previous = abs;
      abs = abs.replace(/\/\.?(\/|$)/g, "/").replace(/\/(?!\.\.)[^\/]+\/\.\.(\/|$)/g, "/");
    } while (abs !== previous);
    return m[1] + "://" + abs;
  }

  var open = window.XMLHttpRequest.prototype.open;
  window.XMLHttpRequest.prototype.open = function() {
    var args = Array.prototype.slice.call(arguments);
    if (args[1] !== null && args[1] !== undefined) {
      args[1] = proxyPrefix + rel2abs(String(args[1]), targetUrl);
    }
    return open.apply(this, args);
  };
})();"##;

/// Complete `<script>` element for a page fetched from `target`.
pub fn interception_script(target: &TargetUrl, prefix: &ProxyPrefix) -> String {
    format!(
        "<script type=\"text/javascript\">{SCRIPT_OPEN}  var targetUrl = {};\n  var proxyPrefix = {};\n{SCRIPT_BODY}</script>",
        js_string(target.as_str()),
        js_string(prefix.as_str()),
    )
}

/// Quote `value` as a JavaScript string literal that is safe inside `<script>`.
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

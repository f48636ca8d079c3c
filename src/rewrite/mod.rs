//! Content rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! text/html body
//!     → html.rs (forms, href/src, style attrs, <style>, script injection)
//!         → css.rs (style text)
//!         → resolve.rs (every reference)
//!         → script.rs (client-side interceptor)
//!
//! text/css body
//!     → css.rs
//!         → resolve.rs
//! ```
//!
//! # Design Decisions
//! - Pure functions: base URL and proxy prefix are passed in, nothing is cached
//! - Every rewritten reference is absolute and starts with the proxy prefix
//! - References that must not be fetched (data:, javascript:, mailto:) are left alone

pub mod css;
pub mod html;
pub mod resolve;
pub mod script;

pub use css::proxify_css;
pub use html::proxify_html;
pub use resolve::resolve;
pub use script::interception_script;

/// ASCII case-insensitive `starts_with`.
pub(crate) fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_ignore_case() {
        assert!(starts_with_ignore_case("DATA:image/png", "data:"));
        assert!(!starts_with_ignore_case("dat", "data:"));
        assert!(!starts_with_ignore_case("é data:", "data:"));
    }
}

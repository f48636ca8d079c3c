//! Rewriting forwarding proxy library.
//!
//! Fetches the URL named in the request path on the client's behalf and
//! rewrites HTML and CSS so that every link, form and resource routes back
//! through the proxy.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use engine::ProxyEngine;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

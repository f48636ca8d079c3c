//! Routing subsystem: which URL does an inbound request want?
//!
//! # Data Flow
//! ```text
//! Inbound path remainder ("http:/example.net/page")
//!     → target.rs (repair, scheme check)
//!     → whitelist.rs (pattern match)
//!     → Target::Url(TargetUrl) | Target::Landing | ProxyError
//!
//! Inbound headers + listener address
//!     → prefix.rs
//!     → ProxyPrefix ("http://proxy.host:8080/")
//! ```
//!
//! # Design Decisions
//! - Whitelist compiled at startup, immutable at runtime
//! - Deterministic: same input always yields the same target
//! - First match wins

pub mod prefix;
pub mod target;
pub mod whitelist;

pub use prefix::ProxyPrefix;
pub use target::{parse_target, Target, TargetUrl};
pub use whitelist::Whitelist;

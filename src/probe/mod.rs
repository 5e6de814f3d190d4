//! Reachability probing for raw URLs
//!
//! Used standalone (`--check-urls`) and as the last stage of source-list
//! discovery.

mod cache;
mod validator;

pub use cache::ReachabilityCache;
pub use validator::UrlValidator;

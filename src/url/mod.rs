//! URL handling module for TVBox-Scout
//!
//! This module provides mirror-prefix stripping, candidate normalization,
//! host extraction with exclusion checks, and the blob-to-raw rewrite that
//! turns a search hit into a fetchable URL.

mod domain;
mod normalize;
mod rewrite;

// Re-export main functions
pub use domain::{extract_host, is_excluded_host};
pub use normalize::{normalize_candidate, strip_proxy_prefix};
pub use rewrite::raw_content_url;

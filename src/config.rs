// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the cloud search provider.
//!
//! # Example
//!
//! ```
//! use cloud_search_provider::CloudSearchConfig;
//!
//! // Minimal config (uses defaults)
//! let config = CloudSearchConfig::default();
//! assert_eq!(config.batch_size, 1000);
//! assert_eq!(config.max_page_size, 1000);
//!
//! // Tuned config
//! let config = CloudSearchConfig {
//!     batch_size: 200,
//!     use_is_match_scoring: true,
//!     match_all_terms: true,
//!     facet_bucket_count: Some(50),
//!     ..Default::default()
//! };
//! assert!(config.use_is_match_scoring);
//! ```

use serde::Deserialize;

use crate::query::paging::effective_page_size;

/// Configuration for query execution and document commits.
///
/// Loading is left to the host; every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloudSearchConfig {
    /// Documents per POST (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Serialized payload bytes per POST (default: 16 MB)
    #[serde(default = "default_batch_max_bytes")]
    pub batch_max_bytes: usize,

    /// Render boosted equality as a relevance predicate
    #[serde(default)]
    pub use_is_match_scoring: bool,

    /// Rows per request, always intersected with the service cap of 1000
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Append `&searchMode=all`
    #[serde(default)]
    pub match_all_terms: bool,

    /// Host scheduler may fan indexing work out in parallel
    #[serde(default)]
    pub parallel_indexing_enabled: bool,

    /// Degree-of-parallelism bound for the host scheduler (0 = unbounded)
    #[serde(default)]
    pub parallel_indexing_core_limit: usize,

    /// Log executed expressions at info instead of debug
    #[serde(default)]
    pub enable_search_debug: bool,

    /// `,count:N` on every facet parameter
    #[serde(default)]
    pub facet_bucket_count: Option<usize>,
}

fn default_batch_size() -> usize { 1000 }
fn default_batch_max_bytes() -> usize { 16 * 1024 * 1024 } // 16 MB
fn default_max_page_size() -> usize { 1000 }

impl Default for CloudSearchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_max_bytes: default_batch_max_bytes(),
            use_is_match_scoring: false,
            max_page_size: default_max_page_size(),
            match_all_terms: false,
            parallel_indexing_enabled: false,
            parallel_indexing_core_limit: 0,
            enable_search_debug: false,
            facet_bucket_count: None,
        }
    }
}

impl CloudSearchConfig {
    /// Page size actually used on the wire.
    #[must_use]
    pub fn page_size(&self) -> usize {
        effective_page_size(self.max_page_size)
    }
}

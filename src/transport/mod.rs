// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search service transport.
//!
//! [`SearchService`] is the seam to the remote index. The HTTP client lives
//! with the host; this crate ships:
//!
//! - [`InMemorySearchService`]: scripted responses plus an in-memory document
//!   store, for tests and demos
//! - [`RetryingSearchService`]: decorator that retries transient failures
//!   with exponential backoff

mod memory;
mod retry;

pub use memory::InMemorySearchService;
pub use retry::{retry, RetryConfig, RetryingSearchService};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TransportError;
use crate::indexing::CloudBatch;

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Name of the remote index, used in log context.
    fn index_name(&self) -> &str;

    /// Run a query-string expression.
    ///
    /// `Ok(None)` means the index has no backing remote resource yet.
    async fn search(&self, expression: &str) -> Result<Option<String>, TransportError>;

    /// POST one batch to the documents endpoint.
    async fn post_documents(&self, batch: &CloudBatch) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: SearchService + ?Sized> SearchService for Arc<T> {
    fn index_name(&self) -> &str {
        (**self).index_name()
    }

    async fn search(&self, expression: &str) -> Result<Option<String>, TransportError> {
        (**self).search(expression).await
    }

    async fn post_documents(&self, batch: &CloudBatch) -> Result<(), TransportError> {
        (**self).post_documents(batch).await
    }
}

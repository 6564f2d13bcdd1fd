// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transport-level retry with exponential backoff.
//!
//! Only [`TransportError::is_transient`] failures are retried. Query
//! compilation and the commit pipeline never retry on their own; wrap the
//! service in [`RetryingSearchService`] to opt in.
//!
//! # Example
//!
//! ```
//! use cloud_search_provider::transport::RetryConfig;
//!
//! let query = RetryConfig::query();
//! assert_eq!(query.max_attempts, 3);
//!
//! let commit = RetryConfig::commit();
//! assert_eq!(commit.max_attempts, 5);
//! ```

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::SearchService;
use crate::error::TransportError;
use crate::indexing::CloudBatch;

/// Backoff settings for one kind of remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Total attempts including the first, at least 1
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

impl RetryConfig {
    /// Quick retry for searches: 3 attempts, 100ms → 2s.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Batch POSTs: 5 attempts, 500ms → 10s. Throttling is common under bulk load.
    #[must_use]
    pub fn commit() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }

    /// Single attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
pub async fn retry<F, Fut, T, E, R>(
    operation_name: &str,
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    ?delay,
                    "Transient failure, retrying"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Retrying decorator over any [`SearchService`].
pub struct RetryingSearchService<S> {
    inner: S,
    search_retry: RetryConfig,
    post_retry: RetryConfig,
}

impl<S: SearchService> RetryingSearchService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, search_retry: RetryConfig::query(), post_retry: RetryConfig::commit() }
    }

    pub fn with_search_retry(mut self, config: RetryConfig) -> Self {
        self.search_retry = config;
        self
    }

    pub fn with_post_retry(mut self, config: RetryConfig) -> Self {
        self.post_retry = config;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SearchService> SearchService for RetryingSearchService<S> {
    fn index_name(&self) -> &str {
        self.inner.index_name()
    }

    async fn search(&self, expression: &str) -> Result<Option<String>, TransportError> {
        retry("search", &self.search_retry, TransportError::is_transient, || {
            self.inner.search(expression)
        })
        .await
    }

    async fn post_documents(&self, batch: &CloudBatch) -> Result<(), TransportError> {
        retry("post_documents", &self.post_retry, TransportError::is_transient, || {
            self.inner.post_documents(batch)
        })
        .await
    }
}

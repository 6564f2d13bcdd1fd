// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Size-bounded commit batches.
//!
//! The [`BatchBuilder`] collects documents until either threshold is hit:
//! document count or serialized bytes. Whichever is hit first makes the
//! batch full.
//!
//! # Example
//!
//! ```
//! use cloud_search_provider::indexing::{BatchBuilder, BatchConfig, CloudSearchDocument, FlushReason};
//!
//! let mut builder = BatchBuilder::new(BatchConfig { flush_count: 2, flush_bytes: 1024 * 1024 });
//! assert_eq!(builder.add_document(CloudSearchDocument::delete("a")), None);
//! assert_eq!(builder.add_document(CloudSearchDocument::delete("b")), Some(FlushReason::Count));
//! assert!(builder.is_full());
//!
//! let batch = builder.release();
//! assert_eq!(batch.len(), 2);
//! builder.clear();
//! assert!(builder.is_empty());
//! ```

use tracing::debug;

use super::document::{CloudBatch, CloudSearchDocument};
use crate::config::CloudSearchConfig;

/// Why a batch became full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Document count threshold reached
    Count,
    /// Byte size threshold reached
    Size,
}

/// Thresholds for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Full after this many documents
    pub flush_count: usize,
    /// Full after this many serialized bytes
    pub flush_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_count: 1000,
            flush_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl From<&CloudSearchConfig> for BatchConfig {
    fn from(config: &CloudSearchConfig) -> Self {
        Self {
            flush_count: config.batch_size.max(1),
            flush_bytes: config.batch_max_bytes.max(1),
        }
    }
}

/// Batch under construction.
#[derive(Debug)]
pub struct BatchBuilder {
    config: BatchConfig,
    documents: Vec<CloudSearchDocument>,
    total_bytes: usize,
}

impl BatchBuilder {
    pub fn new(config: BatchConfig) -> Self {
        Self { config, documents: Vec::new(), total_bytes: 0 }
    }

    /// Add a document, returns the reason if the batch is now full
    pub fn add_document(&mut self, document: CloudSearchDocument) -> Option<FlushReason> {
        self.total_bytes += document.size_bytes();
        self.documents.push(document);
        self.full_reason()
    }

    fn full_reason(&self) -> Option<FlushReason> {
        if self.documents.len() >= self.config.flush_count {
            Some(FlushReason::Count)
        } else if self.total_bytes >= self.config.flush_bytes {
            Some(FlushReason::Size)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full_reason().is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Payload for the current documents. The builder keeps them until
    /// [`clear`](Self::clear) so a failed POST can hand them back.
    pub fn release(&self) -> CloudBatch {
        debug!(count = self.documents.len(), bytes = self.total_bytes, "Batch released for flush");
        CloudBatch::new(self.documents.clone())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.total_bytes = 0;
    }

    /// Take every held document out, leaving the builder empty
    pub fn drain(&mut self) -> Vec<CloudSearchDocument> {
        self.total_bytes = 0;
        std::mem::take(&mut self.documents)
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document staging and batched commits.
//!
//! An [`UpdateContext`] collects uploads and deletes, then [`commit`]
//! drains them through a [`BatchBuilder`] into `POST /docs/index` calls.
//!
//! [`commit`]: UpdateContext::commit

pub mod batch;
pub mod document;
pub mod policy;
pub mod statistics;
pub mod update_context;

pub use batch::{BatchBuilder, BatchConfig, FlushReason};
pub use document::{hash_unique_id, CloudBatch, CloudSearchDocument, SearchAction, SEARCH_ACTION_FIELD};
pub use policy::{
    CommitPolicyExecutor, IndexOperation, IndexingEvent, IndexingEvents, ModificationCountPolicy,
    NullCommitPolicyExecutor, NullIndexingEvents,
};
pub use statistics::ContextOperationStatistics;
pub use update_context::{ParallelOptions, UpdateContext, UpdateContextParts};

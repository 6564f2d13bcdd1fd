// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Commit policy and lifecycle events.
//!
//! Both are collaborators injected by the host. The update context calls the
//! policy under its statistics lock, once per staged mutation, and once after
//! every successful commit. Each update session gets its own policy via
//! [`CommitPolicyExecutor::fork`].

use std::fmt;

/// Kind of staged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOperation {
    Add,
    Update,
    DeleteUnique,
}

/// Strategy deciding when accumulated modifications should be committed.
pub trait CommitPolicyExecutor: Send + fmt::Debug {
    /// Called once when an update session starts.
    fn initialize(&mut self, _index_name: &str) {}

    /// One staged mutation. `payload` is the document key.
    fn index_modified(&mut self, index_name: &str, payload: &str, operation: IndexOperation);

    /// Called after a successful commit.
    fn committed(&mut self);

    /// Whether the host should commit now.
    fn should_commit(&self) -> bool {
        false
    }

    /// Fresh policy for a new update session.
    fn fork(&self) -> Box<dyn CommitPolicyExecutor>;
}

/// Never asks for a commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCommitPolicyExecutor;

impl CommitPolicyExecutor for NullCommitPolicyExecutor {
    fn index_modified(&mut self, _index_name: &str, _payload: &str, _operation: IndexOperation) {}

    fn committed(&mut self) {}

    fn fork(&self) -> Box<dyn CommitPolicyExecutor> {
        Box::new(*self)
    }
}

/// Asks for a commit after `threshold` modifications.
#[derive(Debug, Clone)]
pub struct ModificationCountPolicy {
    threshold: u64,
    modifications: u64,
}

impl ModificationCountPolicy {
    pub fn new(threshold: u64) -> Self {
        Self { threshold: threshold.max(1), modifications: 0 }
    }

    pub fn modifications(&self) -> u64 {
        self.modifications
    }
}

impl CommitPolicyExecutor for ModificationCountPolicy {
    fn index_modified(&mut self, _index_name: &str, _payload: &str, _operation: IndexOperation) {
        self.modifications += 1;
    }

    fn committed(&mut self) {
        self.modifications = 0;
    }

    fn should_commit(&self) -> bool {
        self.modifications >= self.threshold
    }

    fn fork(&self) -> Box<dyn CommitPolicyExecutor> {
        Box::new(Self::new(self.threshold))
    }
}

/// Lifecycle event raised around a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexingEvent {
    Committing,
    Committed,
}

impl IndexingEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Committing => "indexing:committing",
            Self::Committed => "indexing:committed",
        }
    }
}

/// Host event sink.
pub trait IndexingEvents: Send + Sync {
    fn raise(&self, event: IndexingEvent, index_name: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndexingEvents;

impl IndexingEvents for NullIndexingEvents {
    fn raise(&self, _event: IndexingEvent, _index_name: &str) {}
}

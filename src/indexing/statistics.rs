// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::fmt;

/// Per-commit-cycle counters. Reset after each successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextOperationStatistics {
    pub added: u64,
    pub updated: u64,
    pub deleted_unique: u64,
}

impl ContextOperationStatistics {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.added + self.updated + self.deleted_unique
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for ContextOperationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "added: {}, updated: {}, deleted: {}", self.added, self.updated, self.deleted_unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_reset() {
        let mut stats = ContextOperationStatistics { added: 2, updated: 1, deleted_unique: 3 };
        assert_eq!(stats.to_string(), "added: 2, updated: 1, deleted: 3");
        assert_eq!(stats.total(), 6);
        stats.reset();
        assert_eq!(stats, ContextOperationStatistics::default());
    }
}

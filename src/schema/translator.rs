// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Logical field name → remote field name.

/// Built-in logical field holding an item's natural id
pub const BUILTIN_ID_FIELD: &str = "_id";

/// Built-in logical field holding an item's unique id (id + language + version)
pub const BUILTIN_UNIQUE_ID_FIELD: &str = "_uniqueid";

/// Remote document key. Documents are stored under the MD5 hex digest of the
/// unique id, not under the unique id itself.
pub const CLOUD_UNIQUE_ID_FIELD: &str = "s_key";

/// Intended usage of a field name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldUsage {
    /// Filtering and searching
    #[default]
    Query,
    /// Document storage (commit payloads)
    Storage,
    /// `$orderby`
    Sort,
    /// `facet=`
    Facet,
}

/// Field-name translation collaborator.
pub trait FieldNameTranslator: Send + Sync {
    fn index_field_name(&self, field: &str, usage: FieldUsage) -> String;
}

/// Lowercases names and replaces spaces with `_`.
///
/// Remote field names cannot start with an underscore, so built-in names
/// (`_id`, `_uniqueid`, ...) get an `s_` prefix instead: `_id` → `s_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldNameTranslator;

impl FieldNameTranslator for DefaultFieldNameTranslator {
    fn index_field_name(&self, field: &str, _usage: FieldUsage) -> String {
        let trimmed = field.trim();
        let normalized: String = trimmed
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.strip_prefix('_') {
            Some(rest) => format!("s_{}", rest),
            None => normalized,
        }
    }
}

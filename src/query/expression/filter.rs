// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter fragments (`&$filter=...`)
//!
//! # Filter Syntax Generated
//!
//! ```text
//! &$filter=age eq 30                          - Equal
//! &$filter=title ne 'home'                    - Not equal
//! &$filter=age gt 30 / ge / lt / le           - Comparisons
//! &$filter=(age ge 10 and age le 20)          - Between (inclusion per bound)
//! &$filter=hidden / &$filter=not hidden       - Boolean predicate
//! &$filter=tags/any(t: t eq 'news')           - Collection membership
//! &$filter=search.ismatchscoring('title:home^2', null, 'full', null)
//!                                             - Boosted (scored) equality
//! ```

use crate::schema::EdmType;
use crate::value::FieldValue;

/// Which bounds of a range are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusion {
    /// `gt` / `lt`
    #[default]
    None,
    /// `ge` / `lt`
    Lower,
    /// `gt` / `le`
    Upper,
    /// `ge` / `le`
    Both,
}

impl Inclusion {
    #[must_use]
    pub fn includes_lower(&self) -> bool {
        matches!(self, Self::Lower | Self::Both)
    }

    #[must_use]
    pub fn includes_upper(&self) -> bool {
        matches!(self, Self::Upper | Self::Both)
    }
}

/// Filter fragment builder. Every function is pure.
pub struct Filter;

impl Filter {
    /// Full-text relevance predicate over a lucene expression.
    pub fn is_match_scoring(expression: &str) -> String {
        format!(
            "&$filter=search.ismatchscoring('{}', null, 'full', null)",
            escape_literal(expression)
        )
    }

    /// Strict equality; with `use_is_match_scoring` and `boost > 1` this turns
    /// into a relevance predicate so the service ranks instead of filters.
    pub fn equal(field: &str, value: &FieldValue, edm_type: EdmType, boost: f32, use_is_match_scoring: bool) -> String {
        if use_is_match_scoring && boost > 1.0 {
            return Self::is_match_scoring(&format!("{}:{}^{}", field, value, boost));
        }
        if edm_type == EdmType::StringCollection && !value.is_null() {
            return format!("&$filter={}", Self::collection_contains(field, value));
        }
        format!("&$filter={} eq {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn not_equal(field: &str, value: &FieldValue, edm_type: EdmType) -> String {
        if edm_type == EdmType::StringCollection && !value.is_null() {
            return format!("&$filter=not {}", Self::collection_contains(field, value));
        }
        format!("&$filter={} ne {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn greater_than(field: &str, value: &FieldValue, edm_type: EdmType) -> String {
        format!("&$filter={} gt {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn greater_or_equal(field: &str, value: &FieldValue, edm_type: EdmType) -> String {
        format!("&$filter={} ge {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn less_than(field: &str, value: &FieldValue, edm_type: EdmType) -> String {
        format!("&$filter={} lt {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn less_or_equal(field: &str, value: &FieldValue, edm_type: EdmType) -> String {
        format!("&$filter={} le {}", field, Self::prepare_value(value, edm_type))
    }

    pub fn between(field: &str, from: &FieldValue, to: &FieldValue, edm_type: EdmType, inclusion: Inclusion) -> String {
        let from = Self::prepare_value(from, edm_type);
        let to = Self::prepare_value(to, edm_type);

        let left = if inclusion.includes_lower() {
            format!("{} ge {}", field, from)
        } else {
            format!("{} gt {}", field, from)
        };
        let right = if inclusion.includes_upper() {
            format!("{} le {}", field, to)
        } else {
            format!("{} lt {}", field, to)
        };

        format!("&$filter=({} and {})", left, right)
    }

    pub fn is(field: &str, value: bool) -> String {
        if value {
            format!("&$filter={}", field)
        } else {
            format!("&$filter=not {}", field)
        }
    }

    /// Render a literal for the declared type.
    pub fn prepare_value(value: &FieldValue, edm_type: EdmType) -> String {
        match value {
            FieldValue::Null => return "null".to_string(),
            FieldValue::Id(inner) | FieldValue::UniqueId(inner) => return Self::prepare_value(inner, edm_type),
            _ => {}
        }

        match edm_type {
            EdmType::DateTimeOffset => match value {
                FieldValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                other => other.to_string(),
            },
            EdmType::String | EdmType::StringCollection => match value {
                FieldValue::Guid(g) => format!("'{}'", g.simple()),
                FieldValue::StringList(list) if list.len() == 1 => format!("'{}'", escape_literal(&list[0])),
                other => format!("'{}'", escape_literal(&other.to_string())),
            },
            EdmType::Boolean => value.to_string().to_lowercase(),
            _ => value.to_string(),
        }
    }

    fn collection_contains(field: &str, value: &FieldValue) -> String {
        match value {
            FieldValue::StringList(list) if list.len() > 1 => {
                let joined = list.iter().map(|v| escape_literal(v)).collect::<Vec<_>>().join("|");
                format!("{}/any(t: search.in(t, '{}', '|'))", field, joined)
            }
            other => format!(
                "{}/any(t: t eq {})",
                field,
                Self::prepare_value(other, EdmType::StringCollection)
            ),
        }
    }
}

/// OData string literals escape a single quote by doubling it.
pub(crate) fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

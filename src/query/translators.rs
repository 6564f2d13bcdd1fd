// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sub-translators for the non-predicate fragments.
//!
//! ```text
//! &facet=tags,count:20&facet=template        - facet requests
//! &$filter=tags/any(t: search.in(t, 'a|b', '|'))
//!                                            - facet filter values
//! &$orderby=updated desc,title asc           - ordering
//! &$select=s_key,title                       - projection
//! ```
//!
//! All inputs are already mapped: field names are remote names and facet
//! requests carry their declared type.

use crate::query::expression::{merge, Filter, LogicalOperator};
use crate::query::tree::{FacetRequest, QueryMethod};
use crate::schema::EdmType;
use crate::value::FieldValue;

/// Facet fragments plus the filter implied by facet filter values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetExpression {
    /// `&facet=...` parameters, concatenated
    pub facets: String,
    /// `&$filter=...` fragment, empty when no facet carries filter values
    pub filter: String,
}

impl FacetExpression {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty() && self.filter.is_empty()
    }
}

/// Translate facet requests.
pub fn translate_facets(facets: &[FacetRequest], bucket_count: Option<usize>) -> FacetExpression {
    let mut expression = FacetExpression::default();

    for request in facets {
        expression.facets.push_str("&facet=");
        expression.facets.push_str(&request.field);
        if let Some(count) = bucket_count {
            expression.facets.push_str(&format!(",count:{}", count));
        }

        if let Some(filter) = facet_filter(request) {
            expression.filter = merge(&expression.filter, &filter, LogicalOperator::And, true);
        }
    }

    expression
}

fn facet_filter(request: &FacetRequest) -> Option<String> {
    if request.filter_values.is_empty() {
        return None;
    }
    let edm_type = request.edm_type.unwrap_or(EdmType::String);
    let field = &request.field;

    if edm_type.is_string_like() {
        let joined = request
            .filter_values
            .iter()
            .map(|v| scalar_text(v).replace('\'', "''"))
            .collect::<Vec<_>>()
            .join("|");
        let fragment = if edm_type == EdmType::StringCollection {
            format!("&$filter={}/any(t: search.in(t, '{}', '|'))", field, joined)
        } else {
            format!("&$filter=search.in({}, '{}', '|')", field, joined)
        };
        return Some(fragment);
    }

    request
        .filter_values
        .iter()
        .map(|v| Filter::equal(field, v, edm_type, 1.0, false))
        .reduce(|acc, next| merge(&acc, &next, LogicalOperator::Or, false))
        .map(|combined| format!("&$filter=({})", combined.trim_start_matches("&$filter=")))
}

fn scalar_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Guid(g) => g.simple().to_string(),
        FieldValue::Id(inner) | FieldValue::UniqueId(inner) => scalar_text(inner),
        other => other.to_string(),
    }
}

/// Translate `OrderBy` methods into `&$orderby=...`, in method order.
pub fn translate_order_by(methods: &[QueryMethod]) -> String {
    let clauses: Vec<String> = methods
        .iter()
        .filter_map(|m| match m {
            QueryMethod::OrderBy { field, descending } => {
                Some(format!("{} {}", field, if *descending { "desc" } else { "asc" }))
            }
            _ => None,
        })
        .collect();

    if clauses.is_empty() {
        String::new()
    } else {
        format!("&$orderby={}", clauses.join(","))
    }
}

/// Translate `Select` methods into `&$select=...`. Duplicate names are dropped.
pub fn translate_select(methods: &[QueryMethod]) -> String {
    let mut fields: Vec<&str> = Vec::new();
    for m in methods {
        if let QueryMethod::Select(names) = m {
            for name in names {
                if !fields.contains(&name.as_str()) {
                    fields.push(name);
                }
            }
        }
    }

    if fields.is_empty() {
        String::new()
    } else {
        format!("&$select={}", fields.join(","))
    }
}

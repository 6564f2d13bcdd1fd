// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query tree - the caller's logical query
//!
//! A [`QueryTree`] is a predicate tree over logical field names plus an ordered
//! list of [`QueryMethod`]s (paging, ordering, facets, terminal operators) and
//! the [`ExecutionContext`]s the query is scoped to.
//!
//! # Example
//!
//! ```rust
//! use cloud_search_provider::query::{QueryNode, QueryTree, FacetRequest};
//!
//! let tree = QueryTree::builder()
//!     .filter(QueryNode::gt("age", 30))
//!     .filter(QueryNode::eq("template", "article").or(QueryNode::eq("template", "news")))
//!     .take(5)
//!     .skip(2)
//!     .order_by("updated", true)
//!     .facet(FacetRequest::new("tags"))
//!     .build();
//!
//! assert_eq!(tree.methods.len(), 4);
//! ```

use crate::query::expression::Inclusion;
use crate::schema::EdmType;
use crate::value::FieldValue;

/// Field comparison payload shared by the relational nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldComparison {
    /// Logical field name (translated during mapping)
    pub field: String,
    pub value: FieldValue,
    /// Relevance boost, 1.0 = none
    pub boost: f32,
}

impl FieldComparison {
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self { field: field.into(), value: value.into(), boost: 1.0 }
    }
}

/// Predicate tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Equal(FieldComparison),
    NotEqual(FieldComparison),
    GreaterThan(FieldComparison),
    GreaterThanOrEqual(FieldComparison),
    LessThan(FieldComparison),
    LessThanOrEqual(FieldComparison),
    /// Range with per-bound inclusion
    Between {
        field: String,
        from: FieldValue,
        to: FieldValue,
        inclusion: Inclusion,
    },
    /// Boolean field predicate (`hidden` / `not hidden`)
    Boolean { field: String, value: bool },
    /// Full-text relevance predicate
    MatchScoring(FieldComparison),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
    MatchAll,
    MatchNone,
}

impl QueryNode {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Equal(FieldComparison::new(field, value))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::NotEqual(FieldComparison::new(field, value))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::GreaterThan(FieldComparison::new(field, value))
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::GreaterThanOrEqual(FieldComparison::new(field, value))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::LessThan(FieldComparison::new(field, value))
    }

    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::LessThanOrEqual(FieldComparison::new(field, value))
    }

    pub fn between(
        field: impl Into<String>,
        from: impl Into<FieldValue>,
        to: impl Into<FieldValue>,
        inclusion: Inclusion,
    ) -> Self {
        Self::Between { field: field.into(), from: from.into(), to: to.into(), inclusion }
    }

    pub fn is(field: impl Into<String>, value: bool) -> Self {
        Self::Boolean { field: field.into(), value }
    }

    pub fn match_scoring(field: impl Into<String>, value: impl Into<FieldValue>, boost: f32) -> Self {
        Self::MatchScoring(FieldComparison { boost, ..FieldComparison::new(field, value) })
    }

    /// Set the relevance boost on a comparison node. Other nodes are returned unchanged.
    pub fn boost(mut self, boost: f32) -> Self {
        match &mut self {
            Self::Equal(c)
            | Self::NotEqual(c)
            | Self::GreaterThan(c)
            | Self::GreaterThanOrEqual(c)
            | Self::LessThan(c)
            | Self::LessThanOrEqual(c)
            | Self::MatchScoring(c) => c.boost = boost,
            _ => {}
        }
        self
    }

    /// Combine with AND
    pub fn and(self, other: QueryNode) -> Self {
        match self {
            Self::And(mut nodes) => {
                nodes.push(other);
                Self::And(nodes)
            }
            node => Self::And(vec![node, other]),
        }
    }

    /// Combine with OR
    pub fn or(self, other: QueryNode) -> Self {
        match self {
            Self::Or(mut nodes) => {
                nodes.push(other);
                Self::Or(nodes)
            }
            node => Self::Or(vec![node, other]),
        }
    }

    /// Negate
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Facet request over one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRequest {
    /// Logical name before mapping, remote name after
    pub field: String,
    /// Restrict results to documents whose field matches one of these
    pub filter_values: Vec<FieldValue>,
    /// Buckets with fewer documents are dropped from results
    pub min_count: u64,
    /// Declared remote type, filled in by the mapper
    pub edm_type: Option<EdmType>,
}

impl FacetRequest {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), filter_values: Vec::new(), min_count: 1, edm_type: None }
    }

    pub fn with_filter_values(mut self, values: Vec<FieldValue>) -> Self {
        self.filter_values = values;
        self
    }

    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.min_count = min_count;
        self
    }
}

/// Non-predicate query method.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMethod {
    Skip(i64),
    Take(i64),
    OrderBy { field: String, descending: bool },
    Select(Vec<String>),
    Facet(FacetRequest),
    Count,
    Any,
    First { allow_default: bool },
    Single { allow_default: bool },
    ElementAt { index: usize, allow_default: bool },
    GetFacets,
}

impl QueryMethod {
    /// True for methods that end the query with a scalar or single-row result.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Count | Self::Any | Self::First { .. } | Self::Single { .. } | Self::ElementAt { .. } | Self::GetFacets
        )
    }
}

/// Partition / shard selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    pub name: String,
    pub value: String,
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// The caller's logical query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    pub root: QueryNode,
    pub methods: Vec<QueryMethod>,
    pub execution_contexts: Vec<ExecutionContext>,
}

impl QueryTree {
    pub fn new(root: QueryNode) -> Self {
        Self { root, methods: Vec::new(), execution_contexts: Vec::new() }
    }

    pub fn builder() -> QueryTreeBuilder {
        QueryTreeBuilder::new()
    }
}

/// Fluent builder for [`QueryTree`].
///
/// Repeated `filter` calls are ANDed together. With no filter the root is
/// [`QueryNode::MatchAll`].
#[derive(Debug, Default)]
pub struct QueryTreeBuilder {
    filters: Vec<QueryNode>,
    methods: Vec<QueryMethod>,
    execution_contexts: Vec<ExecutionContext>,
}

impl QueryTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, node: QueryNode) -> Self {
        self.filters.push(node);
        self
    }

    pub fn method(mut self, method: QueryMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn skip(self, count: i64) -> Self {
        self.method(QueryMethod::Skip(count))
    }

    pub fn take(self, count: i64) -> Self {
        self.method(QueryMethod::Take(count))
    }

    pub fn order_by(self, field: impl Into<String>, descending: bool) -> Self {
        self.method(QueryMethod::OrderBy { field: field.into(), descending })
    }

    pub fn select(self, fields: Vec<String>) -> Self {
        self.method(QueryMethod::Select(fields))
    }

    pub fn facet(self, request: FacetRequest) -> Self {
        self.method(QueryMethod::Facet(request))
    }

    pub fn count(self) -> Self {
        self.method(QueryMethod::Count)
    }

    pub fn any(self) -> Self {
        self.method(QueryMethod::Any)
    }

    pub fn first(self, allow_default: bool) -> Self {
        self.method(QueryMethod::First { allow_default })
    }

    pub fn single(self, allow_default: bool) -> Self {
        self.method(QueryMethod::Single { allow_default })
    }

    pub fn element_at(self, index: usize, allow_default: bool) -> Self {
        self.method(QueryMethod::ElementAt { index, allow_default })
    }

    pub fn get_facets(self) -> Self {
        self.method(QueryMethod::GetFacets)
    }

    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.execution_contexts.push(context);
        self
    }

    pub fn build(mut self) -> QueryTree {
        let root = match self.filters.len() {
            0 => QueryNode::MatchAll,
            1 => self.filters.remove(0),
            _ => QueryNode::And(self.filters),
        };
        QueryTree { root, methods: self.methods, execution_contexts: self.execution_contexts }
    }
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query tree → compiled remote query.
//!
//! Each comparison node is resolved in three steps:
//!
//! ```text
//! logical field ──translator──▶ remote field ──schema──▶ declared type
//!                                                   │
//!                                   absent ─────────┴──▶ &search=<nothing sentinel>
//! value ──formatter(remote field)──▶ literal ──Filter::op──▶ fragment
//! ```
//!
//! Fragments are merged with AND / OR / NOT, wrapping both operands.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::formatter::ValueFormatter;
use crate::query::expression::{merge, Expression, Filter, LogicalOperator, Search};
use crate::query::tree::{ExecutionContext, FacetRequest, FieldComparison, QueryMethod, QueryNode, QueryTree};
use crate::schema::{FieldNameTranslator, FieldUsage, IndexedField, SchemaAccessor};

/// Post-processing step for fields computed outside the stored schema.
pub trait VirtualFieldProcessor: Send + Sync + fmt::Debug {
    /// Rewrite one raw result row in place.
    fn process_row(&self, row: &mut Map<String, Value>);
}

/// Exposes a stored field under an additional name on every row.
#[derive(Debug, Clone)]
pub struct FieldAliasProcessor {
    alias: String,
    source: String,
}

impl FieldAliasProcessor {
    pub fn new(alias: impl Into<String>, source: impl Into<String>) -> Self {
        Self { alias: alias.into(), source: source.into() }
    }
}

impl VirtualFieldProcessor for FieldAliasProcessor {
    fn process_row(&self, row: &mut Map<String, Value>) {
        if let Some(value) = row.get(&self.source).cloned() {
            row.insert(self.alias.clone(), value);
        }
    }
}

/// Mapper output, consumed once by the execution engine.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Empty, the match-everything marker, or a filter/search expression
    pub expression: String,
    /// Non-filter, non-facet methods with field names resolved
    pub methods: Vec<QueryMethod>,
    /// Facet requests with remote names and declared types
    pub facets: Vec<FacetRequest>,
    pub virtual_field_processors: Vec<Arc<dyn VirtualFieldProcessor>>,
    pub execution_contexts: Vec<ExecutionContext>,
}

impl CompiledQuery {
    /// Compiled query with only an expression.
    pub fn from_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            methods: Vec::new(),
            facets: Vec::new(),
            virtual_field_processors: Vec::new(),
            execution_contexts: Vec::new(),
        }
    }

    pub fn with_methods(mut self, methods: Vec<QueryMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// True when the expression carries the search-for-nothing sentinel.
    #[must_use]
    pub fn is_search_for_nothing(&self) -> bool {
        self.expression.contains(Search::SEARCH_FOR_NOTHING)
    }
}

/// Query compilation seam.
pub trait QueryMapper: Send + Sync {
    fn map(&self, tree: &QueryTree) -> Result<CompiledQuery>;
}

/// Mapper for the cloud index.
pub struct CloudQueryMapper {
    schema: Arc<dyn SchemaAccessor>,
    translator: Arc<dyn FieldNameTranslator>,
    formatter: Arc<dyn ValueFormatter>,
    use_is_match_scoring: bool,
    virtual_field_processors: Vec<Arc<dyn VirtualFieldProcessor>>,
}

impl CloudQueryMapper {
    pub fn new(
        schema: Arc<dyn SchemaAccessor>,
        translator: Arc<dyn FieldNameTranslator>,
        formatter: Arc<dyn ValueFormatter>,
    ) -> Self {
        Self {
            schema,
            translator,
            formatter,
            use_is_match_scoring: false,
            virtual_field_processors: Vec::new(),
        }
    }

    pub fn with_is_match_scoring(mut self, enabled: bool) -> Self {
        self.use_is_match_scoring = enabled;
        self
    }

    pub fn with_virtual_field_processor(mut self, processor: Arc<dyn VirtualFieldProcessor>) -> Self {
        self.virtual_field_processors.push(processor);
        self
    }

    fn resolve(&self, field: &str, usage: FieldUsage) -> (String, Option<IndexedField>) {
        let remote = self.translator.index_field_name(field, usage);
        let entry = self.schema.field_by_cloud_name(&remote);
        (remote, entry)
    }

    fn map_node(&self, node: &QueryNode) -> Result<String> {
        match node {
            QueryNode::Equal(c) => self.map_comparison(c, |f, v, t| {
                Filter::equal(f, v, t, c.boost, self.use_is_match_scoring)
            }),
            QueryNode::NotEqual(c) => self.map_comparison(c, Filter::not_equal),
            QueryNode::GreaterThan(c) => self.map_comparison(c, Filter::greater_than),
            QueryNode::GreaterThanOrEqual(c) => self.map_comparison(c, Filter::greater_or_equal),
            QueryNode::LessThan(c) => self.map_comparison(c, Filter::less_than),
            QueryNode::LessThanOrEqual(c) => self.map_comparison(c, Filter::less_or_equal),
            QueryNode::MatchScoring(c) => self.map_comparison(c, |f, v, _| {
                let boost = if c.boost != 1.0 { format!("^{}", c.boost) } else { String::new() };
                Filter::is_match_scoring(&format!("{}:{}{}", f, v, boost))
            }),
            QueryNode::Between { field, from, to, inclusion } => {
                let (remote, entry) = self.resolve(field, FieldUsage::Query);
                let Some(entry) = entry else {
                    return Ok(self.unknown_field(&remote));
                };
                let from = self.formatter.format_value_for_index_storage(from, &remote)?;
                let to = self.formatter.format_value_for_index_storage(to, &remote)?;
                Ok(Filter::between(&remote, &from, &to, entry.edm_type, *inclusion))
            }
            QueryNode::Boolean { field, value } => {
                let (remote, entry) = self.resolve(field, FieldUsage::Query);
                if entry.is_none() {
                    return Ok(self.unknown_field(&remote));
                }
                Ok(Filter::is(&remote, *value))
            }
            QueryNode::And(nodes) => self.map_logical(nodes, LogicalOperator::And),
            QueryNode::Or(nodes) => self.map_logical(nodes, LogicalOperator::Or),
            QueryNode::Not(inner) => {
                let inner = self.map_node(inner)?;
                Ok(Expression::parse(&inner).negate().to_string())
            }
            QueryNode::MatchAll => Ok(Search::SEARCH_FOR_EVERYTHING.to_string()),
            QueryNode::MatchNone => Ok(Search::nothing()),
        }
    }

    fn map_comparison<F>(&self, comparison: &FieldComparison, render: F) -> Result<String>
    where
        F: Fn(&str, &crate::value::FieldValue, crate::schema::EdmType) -> String,
    {
        let (remote, entry) = self.resolve(&comparison.field, FieldUsage::Query);
        let Some(entry) = entry else {
            return Ok(self.unknown_field(&remote));
        };
        let value = self.formatter.format_value_for_index_storage(&comparison.value, &remote)?;
        Ok(render(&remote, &value, entry.edm_type))
    }

    fn map_logical(&self, nodes: &[QueryNode], op: LogicalOperator) -> Result<String> {
        let mut combined = String::new();
        for node in nodes {
            let fragment = self.map_node(node)?;
            combined = merge(&combined, &fragment, op, true);
        }
        Ok(combined)
    }

    /// Comparisons against unknown fields can never match.
    fn unknown_field(&self, remote: &str) -> String {
        debug!(field = %remote, "Field not in index schema, query matches nothing");
        Search::nothing()
    }

    fn map_methods(&self, methods: &[QueryMethod]) -> Result<(Vec<QueryMethod>, Vec<FacetRequest>)> {
        let mut mapped = Vec::with_capacity(methods.len());
        let mut facets = Vec::new();

        for method in methods {
            match method {
                QueryMethod::OrderBy { field, descending } => {
                    let (remote, entry) = self.resolve(field, FieldUsage::Sort);
                    if entry.is_none() {
                        warn!(field = %remote, "Ignoring ordering on field not in index schema");
                        continue;
                    }
                    mapped.push(QueryMethod::OrderBy { field: remote, descending: *descending });
                }
                QueryMethod::Select(fields) => {
                    let remote: Vec<String> = fields
                        .iter()
                        .filter_map(|f| {
                            let (remote, entry) = self.resolve(f, FieldUsage::Storage);
                            if entry.is_none() {
                                warn!(field = %remote, "Ignoring selection of field not in index schema");
                            }
                            entry.map(|_| remote)
                        })
                        .collect();
                    if !remote.is_empty() {
                        mapped.push(QueryMethod::Select(remote));
                    }
                }
                QueryMethod::Facet(request) => {
                    let (remote, entry) = self.resolve(&request.field, FieldUsage::Facet);
                    let Some(entry) = entry else {
                        warn!(field = %remote, "Ignoring facet on field not in index schema");
                        continue;
                    };
                    let filter_values = request
                        .filter_values
                        .iter()
                        .map(|v| self.formatter.format_value_for_index_storage(v, &remote))
                        .collect::<Result<Vec<_>>>()?;
                    facets.push(FacetRequest {
                        field: remote,
                        filter_values,
                        min_count: request.min_count,
                        edm_type: Some(entry.edm_type),
                    });
                }
                other => mapped.push(other.clone()),
            }
        }

        Ok((mapped, facets))
    }
}

impl QueryMapper for CloudQueryMapper {
    fn map(&self, tree: &QueryTree) -> Result<CompiledQuery> {
        let mut expression = self.map_node(&tree.root)?;
        let (methods, facets) = self.map_methods(&tree.methods)?;

        if expression.is_empty() && methods.is_empty() && facets.is_empty() {
            expression = Search::SEARCH_FOR_EVERYTHING.to_string();
        }

        Ok(CompiledQuery {
            expression,
            methods,
            facets,
            virtual_field_processors: self.virtual_field_processors.clone(),
            execution_contexts: tree.execution_contexts.clone(),
        })
    }
}

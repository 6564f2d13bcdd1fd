// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query pagination and execution.
//!
//! # Pipeline
//!
//! ```text
//! CompiledQuery
//!   │ resolve skip / top            (paging::PagingPlan)
//!   │ facet filter AND expression   (wrap both operands)
//!   │ + &facet= + &$orderby= + &$select= + &$top= + &$skip=
//!   │ + &queryType=full&$count=true [+ &searchMode=all]
//!   ▼
//! nothing sentinel? ──yes──▶ empty page, no remote call
//!   │ no
//!   ▼
//! SearchService::search ──▶ envelope ──▶ page cap ──▶ virtual fields
//!   ▼
//! shape by terminal method: rows | count | any | first | single | element_at | facets
//! ```
//!
//! Execution failures are logged with the index name, the error and the
//! original expression, then returned. Nothing here retries.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::CloudSearchConfig;
use crate::error::{Result, SearchError};
use crate::metrics;
use crate::query::expression::{merge, LogicalOperator, Search};
use crate::query::mapper::CompiledQuery;
use crate::query::paging::{calculate_actual_count_per_page, count_after_paging, PagingPlan};
use crate::query::results::{QueryOutcome, SearchHit, SearchHits, SearchResults};
use crate::query::translators::{translate_facets, translate_order_by, translate_select};
use crate::query::tree::QueryMethod;
use crate::transport::SearchService;

/// Stateless executor; safe to share across tasks.
pub struct QueryExecutor {
    service: Arc<dyn SearchService>,
    config: CloudSearchConfig,
}

impl QueryExecutor {
    pub fn new(service: Arc<dyn SearchService>, config: CloudSearchConfig) -> Self {
        Self { service, config }
    }

    pub fn index_name(&self) -> &str {
        self.service.index_name()
    }

    /// Final wire expression for a compiled query.
    pub fn optimize_expression(&self, query: &CompiledQuery) -> String {
        let plan = PagingPlan::resolve(&query.methods, self.config.max_page_size);
        self.build_expression(query, &plan)
    }

    fn build_expression(&self, query: &CompiledQuery, plan: &PagingPlan) -> String {
        let facets = translate_facets(&query.facets, self.config.facet_bucket_count);

        let mut expression = query.expression.clone();
        if !facets.filter.is_empty() {
            expression = merge(&expression, &facets.filter, LogicalOperator::And, true);
        }
        if expression.is_empty() {
            expression = Search::SEARCH_FOR_EVERYTHING.to_string();
        }

        expression.push_str(&facets.facets);
        expression.push_str(&translate_order_by(&query.methods));
        expression.push_str(&translate_select(&query.methods));
        expression.push_str(&format!("&$top={}", plan.top));
        if plan.wire_skip > 0 {
            expression.push_str(&format!("&$skip={}", plan.wire_skip));
        }
        expression.push_str("&queryType=full&$count=true");
        if self.config.match_all_terms {
            expression.push_str("&searchMode=all");
        }
        expression
    }

    /// Execute and shape the result by the query's terminal method.
    pub async fn execute(&self, query: &CompiledQuery) -> Result<QueryOutcome> {
        let plan = PagingPlan::resolve(&query.methods, self.config.max_page_size);
        let terminal = terminal_method(&query.methods);
        let results = self.fetch(query, &plan, terminal).await?;
        self.shape(results, query, &plan, terminal)
    }

    /// Execute and return typed rows, lazily deserialized.
    ///
    /// Scalar terminals (count / any / facets) yield no rows; the total
    /// count and facets stay available on the returned sequence.
    pub async fn find_elements<T: DeserializeOwned>(&self, query: &CompiledQuery) -> Result<SearchHits<T>> {
        let plan = PagingPlan::resolve(&query.methods, self.config.max_page_size);
        let terminal = terminal_method(&query.methods);
        let results = self.fetch(query, &plan, terminal).await?;

        let total_count = results.total_count;
        let facets = results.facets.clone();
        let hits: Vec<SearchHit> = match self.shape(results, query, &plan, terminal)? {
            QueryOutcome::Results(page) => return Ok(SearchHits::new(page)),
            outcome => outcome.hit().cloned().into_iter().collect(),
        };
        Ok(SearchHits::new(SearchResults { hits, total_count, facets }))
    }

    async fn fetch(
        &self,
        query: &CompiledQuery,
        plan: &PagingPlan,
        terminal: Option<&QueryMethod>,
    ) -> Result<SearchResults> {
        let index = self.service.index_name();
        let label = terminal_label(terminal);
        let expression = self.build_expression(query, plan);

        if expression.contains(Search::SEARCH_FOR_NOTHING) {
            debug!(index = %index, "Expression can match nothing, skipping remote call");
            metrics::record_query(index, label, "short_circuit");
            return Ok(SearchResults::default());
        }

        if self.config.enable_search_debug {
            info!(index = %index, expression = %expression, "Executing search");
        } else {
            debug!(index = %index, expression = %expression, "Executing search");
        }

        let response = {
            let _timer = metrics::LatencyTimer::new(index);
            self.service.search(&expression).await
        };

        let parsed = match response {
            Ok(Some(body)) => SearchResults::parse(&body),
            Ok(None) => {
                debug!(index = %index, "Index has no backing resource, returning empty results");
                Ok(SearchResults::default())
            }
            Err(e) => Err(SearchError::from(e)),
        };

        let mut results = match parsed {
            Ok(results) => results,
            Err(e) => {
                error!(
                    index = %index,
                    error = %e,
                    expression = %query.expression,
                    "Search execution failed"
                );
                metrics::record_query(index, label, "error");
                return Err(e);
            }
        };

        results.hits.truncate(self.config.page_size());
        for hit in &mut results.hits {
            for processor in &query.virtual_field_processors {
                processor.process_row(&mut hit.fields);
            }
        }
        results.facets.apply_min_counts(&query.facets);

        metrics::record_query(index, label, "success");
        metrics::record_rows_returned(index, results.hits.len());
        Ok(results)
    }

    fn shape(
        &self,
        mut results: SearchResults,
        query: &CompiledQuery,
        plan: &PagingPlan,
        terminal: Option<&QueryMethod>,
    ) -> Result<QueryOutcome> {
        let total = results.total_count;

        let outcome = match terminal {
            None => {
                let visible =
                    calculate_actual_count_per_page(total, plan.take, Some(plan.skip), self.config.page_size());
                results.hits.truncate(visible);
                QueryOutcome::Results(results)
            }
            Some(QueryMethod::Count) => QueryOutcome::Count(count_after_paging(total, plan.take, plan.skip)),
            Some(QueryMethod::Any) => {
                QueryOutcome::Any(count_after_paging(total, plan.take, plan.skip) > 0 || !results.hits.is_empty())
            }
            Some(QueryMethod::GetFacets) => QueryOutcome::Facets(results.facets),
            Some(QueryMethod::First { allow_default }) => match results.hits.into_iter().next() {
                Some(hit) => QueryOutcome::Single(Some(hit)),
                None if *allow_default => QueryOutcome::Single(None),
                None => return Err(SearchError::SequenceEmpty),
            },
            Some(QueryMethod::Single { allow_default }) => match results.hits.len() {
                0 if *allow_default => QueryOutcome::Single(None),
                0 => return Err(SearchError::SequenceEmpty),
                1 => QueryOutcome::Single(results.hits.pop()),
                _ => return Err(SearchError::MoreThanOneElement),
            },
            Some(QueryMethod::ElementAt { index, allow_default }) => {
                let index = *index;
                let len = count_after_paging(total, plan.take, plan.skip) as usize;
                let Some(slot_count) = index.checked_add(1) else {
                    return Err(SearchError::ElementIndexOutOfRange { index, len });
                };
                match results.hits.len() {
                    0 if *allow_default => QueryOutcome::Element { index, slots: vec![None; slot_count] },
                    0 => return Err(SearchError::ElementIndexOutOfRange { index, len }),
                    1 => {
                        let mut slots = vec![None; slot_count];
                        slots[index] = results.hits.pop();
                        QueryOutcome::Element { index, slots }
                    }
                    rows => {
                        error!(
                            index_name = %self.service.index_name(),
                            element = index,
                            rows,
                            expression = %query.expression,
                            "ElementAt received more than one row"
                        );
                        return Err(SearchError::AmbiguousElementAt { index, rows });
                    }
                }
            }
            Some(_) => QueryOutcome::Results(results),
        };

        Ok(outcome)
    }
}

fn terminal_method(methods: &[QueryMethod]) -> Option<&QueryMethod> {
    methods.iter().rev().find(|m| m.is_terminal())
}

fn terminal_label(terminal: Option<&QueryMethod>) -> &'static str {
    match terminal {
        None => "rows",
        Some(QueryMethod::Count) => "count",
        Some(QueryMethod::Any) => "any",
        Some(QueryMethod::First { .. }) => "first",
        Some(QueryMethod::Single { .. }) => "single",
        Some(QueryMethod::ElementAt { .. }) => "element_at",
        Some(QueryMethod::GetFacets) => "facets",
        Some(_) => "rows",
    }
}

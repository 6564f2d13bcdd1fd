// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query compilation and execution.
//!
//! ```text
//! QueryTree ──CloudQueryMapper──▶ CompiledQuery ──QueryExecutor──▶ QueryOutcome / SearchHits<T>
//! ```

pub mod engine;
pub mod expression;
pub mod mapper;
pub mod paging;
pub mod results;
pub mod translators;
pub mod tree;

pub use engine::QueryExecutor;
pub use expression::{Expression, Filter, Inclusion, LogicalOperator, Search};
pub use mapper::{CloudQueryMapper, CompiledQuery, FieldAliasProcessor, QueryMapper, VirtualFieldProcessor};
pub use paging::{calculate_actual_count_per_page, real_skip_value, real_take_value, PagingPlan, SERVICE_PAGE_CAP};
pub use results::{FacetResults, FacetValue, QueryOutcome, SearchHit, SearchHits, SearchResults};
pub use tree::{ExecutionContext, FacetRequest, FieldComparison, QueryMethod, QueryNode, QueryTree, QueryTreeBuilder};

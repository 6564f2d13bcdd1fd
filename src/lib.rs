// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Cloud Search Provider
//!
//! Client-side query compiler and batched document pipeline for a REST
//! full-text search service that speaks OData filters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Read side                              │
//! │  QueryTree ──CloudQueryMapper──▶ CompiledQuery              │
//! │  • field names translated, values formatted per schema     │
//! │  • &$filter= / &search= fragments merged with AND/OR/NOT   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    QueryExecutor                            │
//! │  • $skip / $top / $count=true, facets, order, select       │
//! │  • @odata.count + @search.facets envelope                  │
//! │  • terminal shaping: count, any, first, single, element_at │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                       SearchService (transport)
//!                              ▲
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Write side                             │
//! │  UpdateContext: stage uploads / deletes (MD5 of unique id) │
//! │  commit: BatchBuilder ──▶ POST ──failure──▶ requeue        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cloud_search_provider::{CloudSearchProviderIndex, IndexSchema, QueryNode, QueryOutcome, QueryTree};
//! use cloud_search_provider::transport::InMemorySearchService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = Arc::new(InMemorySearchService::new("web"));
//!     let schema = Arc::new(IndexSchema::new().key("s_key").int64("age"));
//!     let index = CloudSearchProviderIndex::builder(service, schema).build();
//!
//!     let tree = QueryTree::builder()
//!         .filter(QueryNode::gt("age", 30))
//!         .skip(2)
//!         .take(5)
//!         .build();
//!
//!     match index.create_search_context().query(&tree).await.expect("query failed") {
//!         QueryOutcome::Results(page) => println!("{} of {}", page.hits.len(), page.total_count),
//!         other => println!("{:?}", other),
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`query`]: query tree, mapper, expression builder, paging and execution
//! - [`indexing`]: documents, batch builder, update context, commit policy
//! - [`transport`]: search service seam, in-memory service, retry decorator
//! - [`schema`]: declared field types and field-name translation
//! - [`formatter`]: value coercion toward declared types
//! - [`provider`]: the [`CloudSearchProviderIndex`] composing all of the above

pub mod config;
pub mod error;
pub mod formatter;
pub mod indexing;
pub mod metrics;
pub mod provider;
pub mod query;
pub mod schema;
pub mod transport;
pub mod value;

pub use config::CloudSearchConfig;
pub use error::{Result, SearchError, TransportError};
pub use formatter::{CloudIndexFieldStorageValueFormatter, ValueFormatter};
pub use indexing::{
    hash_unique_id, CloudBatch, CloudSearchDocument, CommitPolicyExecutor, ContextOperationStatistics, IndexingEvent,
    IndexingEvents, SearchAction, UpdateContext,
};
pub use metrics::LatencyTimer;
pub use provider::{CloudSearchProviderIndex, SearchContext};
pub use query::{
    CompiledQuery, FacetRequest, QueryExecutor, QueryMapper, QueryMethod, QueryNode, QueryOutcome, QueryTree,
    SearchHit, SearchHits, SearchResults,
};
pub use schema::{EdmType, FieldNameTranslator, IndexSchema, IndexedField, SchemaAccessor};
pub use transport::{RetryConfig, SearchService};
pub use value::FieldValue;

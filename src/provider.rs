// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Provider index: the entry point hosts hold on to.
//!
//! All collaborators are injected through [`CloudSearchProviderIndexBuilder`];
//! the index wires them into search and update contexts.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloud_search_provider::provider::CloudSearchProviderIndex;
//! use cloud_search_provider::query::{QueryNode, QueryTree};
//! use cloud_search_provider::schema::IndexSchema;
//! use cloud_search_provider::transport::InMemorySearchService;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> cloud_search_provider::Result<()> {
//! let service = Arc::new(InMemorySearchService::new("web"));
//! let schema = Arc::new(IndexSchema::new().key("s_key").string("title").int64("age"));
//! let index = CloudSearchProviderIndex::builder(service, schema).build();
//!
//! let update = index.create_update_context();
//! update.add_document(&json!({ "s_key": "k1", "title": "Home", "age": 40 }))?;
//! update.commit().await?;
//!
//! let search = index.create_search_context();
//! let tree = QueryTree::builder().filter(QueryNode::gt("age", 30)).take(5).build();
//! let outcome = search.query(&tree).await?;
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::config::CloudSearchConfig;
use crate::error::Result;
use crate::formatter::{CloudIndexFieldStorageValueFormatter, ValueFormatter};
use crate::indexing::{
    CommitPolicyExecutor, IndexingEvents, NullCommitPolicyExecutor, NullIndexingEvents, UpdateContext,
    UpdateContextParts,
};
use crate::query::{
    CloudQueryMapper, CompiledQuery, QueryExecutor, QueryMapper, QueryOutcome, QueryTree, SearchHits,
    VirtualFieldProcessor,
};
use crate::schema::{
    DefaultFieldNameTranslator, FieldNameTranslator, FieldUsage, IndexedField, LayeredSchema, SchemaAccessor,
};
use crate::transport::SearchService;

pub struct CloudSearchProviderIndex {
    name: String,
    config: CloudSearchConfig,
    service: Arc<dyn SearchService>,
    schema: Arc<dyn SchemaAccessor>,
    translator: Arc<dyn FieldNameTranslator>,
    formatter: Arc<dyn ValueFormatter>,
    mapper: Arc<dyn QueryMapper>,
    /// Prototype; each update context gets a fork
    commit_policy: Mutex<Box<dyn CommitPolicyExecutor>>,
    events: Arc<dyn IndexingEvents>,
}

impl CloudSearchProviderIndex {
    pub fn builder(service: Arc<dyn SearchService>, schema: Arc<dyn SchemaAccessor>) -> CloudSearchProviderIndexBuilder {
        CloudSearchProviderIndexBuilder::new(service, schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CloudSearchConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<dyn SchemaAccessor> {
        &self.schema
    }

    pub fn translator(&self) -> &Arc<dyn FieldNameTranslator> {
        &self.translator
    }

    /// Schema entry for a host field name, translated to its remote name.
    pub fn field(&self, name: &str) -> Result<IndexedField> {
        let remote = self.translator.index_field_name(name, FieldUsage::Query);
        self.schema.require_field(&remote)
    }

    pub fn create_search_context(&self) -> SearchContext {
        SearchContext {
            mapper: self.mapper.clone(),
            executor: QueryExecutor::new(self.service.clone(), self.config.clone()),
        }
    }

    /// New update session, with its own fork of the commit policy.
    pub fn create_update_context(&self) -> UpdateContext {
        debug!(index = %self.name, "Creating update context");
        UpdateContext::new(UpdateContextParts {
            service: self.service.clone(),
            mapper: self.mapper.clone(),
            formatter: self.formatter.clone(),
            translator: self.translator.clone(),
            policy: self.commit_policy.lock().fork(),
            events: self.events.clone(),
            config: self.config.clone(),
        })
    }
}

pub struct CloudSearchProviderIndexBuilder {
    service: Arc<dyn SearchService>,
    schema: Arc<dyn SchemaAccessor>,
    remote_schema: Option<Arc<dyn SchemaAccessor>>,
    config: CloudSearchConfig,
    translator: Option<Arc<dyn FieldNameTranslator>>,
    formatter: Option<Arc<dyn ValueFormatter>>,
    commit_policy: Box<dyn CommitPolicyExecutor>,
    events: Arc<dyn IndexingEvents>,
    virtual_fields: Vec<Arc<dyn VirtualFieldProcessor>>,
}

impl CloudSearchProviderIndexBuilder {
    fn new(service: Arc<dyn SearchService>, schema: Arc<dyn SchemaAccessor>) -> Self {
        Self {
            service,
            schema,
            remote_schema: None,
            config: CloudSearchConfig::default(),
            translator: None,
            formatter: None,
            commit_policy: Box::new(NullCommitPolicyExecutor),
            events: Arc::new(NullIndexingEvents),
            virtual_fields: Vec::new(),
        }
    }

    pub fn config(mut self, config: CloudSearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Schema reported by the service, consulted after the local one.
    pub fn remote_schema(mut self, schema: Arc<dyn SchemaAccessor>) -> Self {
        self.remote_schema = Some(schema);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn FieldNameTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Defaults to a [`CloudIndexFieldStorageValueFormatter`] over the schema.
    pub fn formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn commit_policy(mut self, policy: Box<dyn CommitPolicyExecutor>) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn events(mut self, events: Arc<dyn IndexingEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn virtual_field_processor(mut self, processor: Arc<dyn VirtualFieldProcessor>) -> Self {
        self.virtual_fields.push(processor);
        self
    }

    pub fn build(self) -> CloudSearchProviderIndex {
        let schema: Arc<dyn SchemaAccessor> = match self.remote_schema {
            Some(remote) => Arc::new(LayeredSchema::new(self.schema, remote)),
            None => self.schema,
        };
        let translator = self.translator.unwrap_or_else(|| Arc::new(DefaultFieldNameTranslator));
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(CloudIndexFieldStorageValueFormatter::new(schema.clone())));

        let mapper = self.virtual_fields.into_iter().fold(
            CloudQueryMapper::new(schema.clone(), translator.clone(), formatter.clone())
                .with_is_match_scoring(self.config.use_is_match_scoring),
            |mapper, processor| mapper.with_virtual_field_processor(processor),
        );

        CloudSearchProviderIndex {
            name: self.service.index_name().to_string(),
            config: self.config,
            service: self.service,
            schema,
            translator,
            formatter,
            mapper: Arc::new(mapper),
            commit_policy: Mutex::new(self.commit_policy),
            events: self.events,
        }
    }
}

/// Read-side session.
pub struct SearchContext {
    mapper: Arc<dyn QueryMapper>,
    executor: QueryExecutor,
}

impl SearchContext {
    pub fn index_name(&self) -> &str {
        self.executor.index_name()
    }

    pub fn map(&self, tree: &QueryTree) -> Result<CompiledQuery> {
        self.mapper.map(tree)
    }

    pub fn optimize_expression(&self, query: &CompiledQuery) -> String {
        self.executor.optimize_expression(query)
    }

    pub async fn execute(&self, query: &CompiledQuery) -> Result<QueryOutcome> {
        self.executor.execute(query).await
    }

    pub async fn find_elements<T: DeserializeOwned>(&self, query: &CompiledQuery) -> Result<SearchHits<T>> {
        self.executor.find_elements(query).await
    }

    /// Map then execute.
    pub async fn query(&self, tree: &QueryTree) -> Result<QueryOutcome> {
        let compiled = self.map(tree)?;
        self.execute(&compiled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::ModificationCountPolicy;
    use crate::query::{FieldAliasProcessor, QueryNode};
    use crate::error::SearchError;
    use crate::schema::{EdmType, IndexSchema};
    use crate::transport::InMemorySearchService;
    use serde::Deserialize;
    use serde_json::json;

    fn index(service: Arc<InMemorySearchService>) -> CloudSearchProviderIndex {
        let schema = Arc::new(IndexSchema::new().key("s_key").string("title").int64("age"));
        CloudSearchProviderIndex::builder(service, schema).build()
    }

    #[tokio::test]
    async fn test_update_then_search_round_trip() {
        let service = Arc::new(InMemorySearchService::new("web"));
        let index = index(service.clone());
        assert_eq!(index.name(), "web");

        let update = index.create_update_context();
        for i in 0..3 {
            update.add_document(&json!({ "s_key": format!("k{}", i), "title": "t", "age": i })).unwrap();
        }
        update.commit().await.unwrap();

        let search = index.create_search_context();
        let outcome = search.query(&QueryTree::builder().count().build()).await.unwrap();
        assert!(matches!(outcome, QueryOutcome::Count(3)));
    }

    #[tokio::test]
    async fn test_query_maps_then_executes() {
        let service = Arc::new(InMemorySearchService::new("web"));
        service.respond_with_rows(vec![json!({ "s_key": "a", "age": 41 })], 12);
        let search = index(service.clone()).create_search_context();

        let tree = QueryTree::builder().filter(QueryNode::gt("age", 30)).take(5).skip(2).build();
        let outcome = search.query(&tree).await.unwrap();

        let expr = service.last_expression().unwrap();
        assert!(expr.starts_with("&$filter=age gt 30"));
        assert!(expr.contains("&$top=5"));
        assert!(expr.contains("&$skip=2"));
        match outcome {
            QueryOutcome::Results(results) => assert_eq!(results.total_count, 12),
            other => panic!("Expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_elements_typed() {
        #[derive(Deserialize)]
        struct Page {
            title: String,
        }

        let service = Arc::new(InMemorySearchService::new("web"));
        service.respond_with_rows(vec![json!({ "s_key": "a", "title": "Home" })], 1);
        let search = index(service).create_search_context();

        let compiled = search.map(&QueryTree::builder().build()).unwrap();
        let pages: Vec<Page> = search.find_elements(&compiled).await.unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Home");
    }

    #[tokio::test]
    async fn test_virtual_field_processor_applied() {
        let service = Arc::new(InMemorySearchService::new("web"));
        service.respond_with_rows(vec![json!({ "s_key": "a", "title": "Home" })], 1);
        let schema = Arc::new(IndexSchema::new().key("s_key").string("title"));
        let index = CloudSearchProviderIndex::builder(service, schema)
            .virtual_field_processor(Arc::new(FieldAliasProcessor::new("name", "title")))
            .build();

        let outcome = index.create_search_context().query(&QueryTree::builder().build()).await.unwrap();
        let QueryOutcome::Results(results) = outcome else { panic!("Expected rows") };
        assert_eq!(results.hits[0].get("name"), Some(&json!("Home")));
    }

    #[tokio::test]
    async fn test_remote_schema_backs_the_local_one() {
        let service = Arc::new(InMemorySearchService::new("web"));
        service.respond_with_rows(vec![], 0);
        let local = Arc::new(IndexSchema::new().key("s_key").string("title"));
        let remote = Arc::new(IndexSchema::new().int64("rating"));
        let index = CloudSearchProviderIndex::builder(service.clone(), local).remote_schema(remote).build();

        assert_eq!(index.field("Rating").unwrap().edm_type, EdmType::Int64);
        assert_eq!(index.field("title").unwrap().edm_type, EdmType::String);

        let search = index.create_search_context();
        let compiled = search.map(&QueryTree::builder().filter(QueryNode::gt("rating", "4")).build()).unwrap();
        assert_eq!(compiled.expression, "&$filter=rating gt 4");
        search.execute(&compiled).await.unwrap();
        assert!(service.last_expression().unwrap().starts_with("&$filter=rating gt 4"));
    }

    #[test]
    fn test_field_lookup_reports_undeclared_name() {
        let service = Arc::new(InMemorySearchService::new("web"));
        let index = index(service);
        assert!(index.field("age").is_ok());
        match index.field("Missing") {
            Err(SearchError::SchemaFieldNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("Expected SchemaFieldNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_update_contexts_fork_policy() {
        let service = Arc::new(InMemorySearchService::new("web"));
        let schema = Arc::new(IndexSchema::new().key("s_key"));
        let index = CloudSearchProviderIndex::builder(service, schema)
            .commit_policy(Box::new(ModificationCountPolicy::new(1)))
            .build();

        let first = index.create_update_context();
        first.delete_by_unique_id("a").unwrap();
        assert!(first.should_commit());

        let second = index.create_update_context();
        assert!(!second.should_commit());
    }
}

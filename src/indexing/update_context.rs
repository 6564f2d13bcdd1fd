// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Update context - one document mutation session.
//!
//! # Concurrency
//!
//! ```text
//! crawler threads ──add/update/delete──▶ pending (DashMap, unordered)
//!                         │
//!                         └─▶ statistics + commit policy (one Mutex)
//!
//! commit ──drain one──▶ BatchBuilder ──full or drained──▶ POST
//!                              │
//!                      POST failed: every document still in the
//!                      builder goes back to pending, error returned
//! ```
//!
//! Commits on the same context are serialized. Staging may run concurrently
//! with a commit; documents staged mid-commit are picked up by the same loop.

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::batch::{BatchBuilder, BatchConfig};
use super::document::{hash_unique_id, CloudSearchDocument};
use super::policy::{CommitPolicyExecutor, IndexOperation, IndexingEvent, IndexingEvents};
use super::statistics::ContextOperationStatistics;
use crate::config::CloudSearchConfig;
use crate::error::{Result, SearchError};
use crate::formatter::ValueFormatter;
use crate::metrics;
use crate::query::{CompiledQuery, Filter, QueryExecutor, QueryMapper, QueryMethod, QueryNode, QueryOutcome, QueryTree};
use crate::schema::{EdmType, FieldNameTranslator, FieldUsage, BUILTIN_ID_FIELD, BUILTIN_UNIQUE_ID_FIELD, CLOUD_UNIQUE_ID_FIELD};
use crate::transport::SearchService;
use crate::value::FieldValue;

/// Options handed to the host scheduler when it fans indexing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelOptions {
    /// `None` = unbounded
    pub max_degree_of_parallelism: Option<usize>,
}

struct CommitState {
    statistics: ContextOperationStatistics,
    policy: Box<dyn CommitPolicyExecutor>,
}

/// Collaborators an update context is built from.
pub struct UpdateContextParts {
    pub service: Arc<dyn SearchService>,
    pub mapper: Arc<dyn QueryMapper>,
    pub formatter: Arc<dyn ValueFormatter>,
    pub translator: Arc<dyn FieldNameTranslator>,
    pub policy: Box<dyn CommitPolicyExecutor>,
    pub events: Arc<dyn IndexingEvents>,
    pub config: CloudSearchConfig,
}

pub struct UpdateContext {
    index_name: String,
    service: Arc<dyn SearchService>,
    executor: QueryExecutor,
    mapper: Arc<dyn QueryMapper>,
    formatter: Arc<dyn ValueFormatter>,
    translator: Arc<dyn FieldNameTranslator>,
    events: Arc<dyn IndexingEvents>,
    config: CloudSearchConfig,
    pending: DashMap<u64, CloudSearchDocument>,
    sequence: AtomicU64,
    state: Mutex<CommitState>,
    processed: DashSet<String>,
    commit_lock: tokio::sync::Mutex<()>,
}

impl UpdateContext {
    pub fn new(parts: UpdateContextParts) -> Self {
        let UpdateContextParts { service, mapper, formatter, translator, mut policy, events, config } = parts;
        let index_name = service.index_name().to_string();
        policy.initialize(&index_name);

        Self {
            executor: QueryExecutor::new(service.clone(), config.clone()),
            index_name,
            service,
            mapper,
            formatter,
            translator,
            events,
            config,
            pending: DashMap::new(),
            sequence: AtomicU64::new(0),
            state: Mutex::new(CommitState { statistics: ContextOperationStatistics::default(), policy }),
            processed: DashSet::new(),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Stage a document for upload.
    pub fn add_document<T: Serialize + ?Sized>(&self, item: &T) -> Result<()> {
        self.stage_upload(item, IndexOperation::Add)
    }

    /// Stage a document for upload. The service does not distinguish create
    /// from full replace.
    pub fn update_document<T: Serialize + ?Sized>(&self, item: &T) -> Result<()> {
        self.stage_upload(item, IndexOperation::Update)
    }

    /// Stage a delete keyed by the hashed unique id.
    pub fn delete_by_unique_id(&self, unique_id: &str) -> Result<()> {
        if unique_id.is_empty() {
            return Err(SearchError::InvalidArgument("unique id must not be empty".into()));
        }
        let key = hash_unique_id(unique_id);
        self.enqueue(CloudSearchDocument::delete(key.clone()));
        self.record(IndexOperation::DeleteUnique, &key);
        Ok(())
    }

    /// Look up every document with this natural id and stage their deletes.
    ///
    /// No backing index yet, or no match, is a no-op.
    pub async fn delete_by_id(&self, id: &FieldValue) -> Result<usize> {
        let field = self.translator.index_field_name(BUILTIN_ID_FIELD, FieldUsage::Query);
        let formatted = self.formatter.format_value_for_index_storage(id, &field)?;
        let lookup = Filter::equal(&field, &formatted, EdmType::String, 1.0, false);
        let query = CompiledQuery::from_expression(lookup)
            .with_methods(vec![QueryMethod::Select(vec![CLOUD_UNIQUE_ID_FIELD.to_string()])]);

        let keys = self.lookup_keys(&query).await?;
        if keys.is_empty() {
            info!(index = %self.index_name, id = %id, "Document not found, nothing to delete");
            return Ok(0);
        }
        Ok(self.stage_deletes(keys))
    }

    /// Delete every document matching all `field = value` pairs.
    pub async fn delete_by_criteria(&self, criteria: &[(String, FieldValue)]) -> Result<usize> {
        if criteria.is_empty() {
            return Err(SearchError::InvalidArgument("delete criteria must not be empty".into()));
        }

        let mut builder = QueryTree::builder().select(vec![CLOUD_UNIQUE_ID_FIELD.to_string()]);
        for (field, value) in criteria {
            builder = builder.filter(QueryNode::eq(field.as_str(), value.clone()));
        }
        let base = self.mapper.map(&builder.build())?;

        let page = self.config.page_size();
        let mut keys = Vec::new();
        let mut skip = 0usize;
        loop {
            let mut query = base.clone();
            query.methods.push(QueryMethod::Skip(skip as i64));
            query.methods.push(QueryMethod::Take(page as i64));

            let results = match self.executor.execute(&query).await? {
                QueryOutcome::Results(results) => results,
                _ => break,
            };
            let fetched = results.hits.len();
            keys.extend(results.hits.iter().filter_map(|h| key_of(&h.fields)));

            skip += fetched;
            if fetched == 0 || skip as u64 >= results.total_count {
                break;
            }
        }

        debug!(index = %self.index_name, matched = keys.len(), "Delete by criteria");
        Ok(self.stage_deletes(keys))
    }

    /// Flush every pending document.
    ///
    /// On a failed POST every document still in the in-flight batch returns
    /// to pending, statistics stay as they were, and the error is returned.
    pub async fn commit(&self) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let started = Instant::now();

        self.events.raise(IndexingEvent::Committing, &self.index_name);
        let statistics = self.state.lock().statistics;
        debug!(index = %self.index_name, statistics = %statistics, pending = self.pending.len(), "Committing");
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut builder = BatchBuilder::new(BatchConfig::from(&self.config));
        loop {
            if let Some(document) = self.take_one() {
                builder.add_document(document);
            }

            let drained = self.pending.is_empty();
            if builder.is_full() || (drained && !builder.is_empty()) {
                let batch = builder.release();
                match self.service.post_documents(&batch).await {
                    Ok(()) => {
                        metrics::record_batch_posted(&self.index_name, batch.len(), true);
                        builder.clear();
                    }
                    Err(e) => {
                        metrics::record_batch_posted(&self.index_name, batch.len(), false);
                        let requeued = builder.drain();
                        let count = requeued.len();
                        for document in requeued {
                            self.enqueue(document);
                        }
                        metrics::record_documents_requeued(&self.index_name, count);
                        error!(index = %self.index_name, error = %e, requeued = count, "Commit failed");
                        return Err(SearchError::PartialCommitFailure {
                            index: self.index_name.clone(),
                            requeued: count,
                            source: e,
                        });
                    }
                }
            }

            if self.pending.is_empty() && builder.is_empty() {
                break;
            }
        }

        {
            let mut state = self.state.lock();
            state.statistics.reset();
            state.policy.committed();
        }
        metrics::set_pending_documents(&self.index_name, self.pending.len());
        metrics::record_commit_latency(&self.index_name, started.elapsed());
        self.events.raise(IndexingEvent::Committed, &self.index_name);
        debug!(index = %self.index_name, "Committed");
        Ok(())
    }

    /// The service optimizes on its own.
    pub fn optimize(&self) {
        debug!(index = %self.index_name, "Optimize requested, nothing to do");
    }

    pub fn is_parallel(&self) -> bool {
        self.config.parallel_indexing_enabled
    }

    pub fn parallel_options(&self) -> ParallelOptions {
        let limit = self.config.parallel_indexing_core_limit;
        ParallelOptions { max_degree_of_parallelism: (limit > 0).then_some(limit) }
    }

    /// Remember that an item was handled in this session.
    pub fn mark_processed(&self, unique_id: impl Into<String>) {
        self.processed.insert(unique_id.into());
    }

    pub fn is_processed(&self, unique_id: &str) -> bool {
        self.processed.contains(unique_id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Snapshot of the pending documents, in no particular order.
    pub fn pending_documents(&self) -> Vec<CloudSearchDocument> {
        self.pending.iter().map(|r| r.value().clone()).collect()
    }

    pub fn statistics(&self) -> ContextOperationStatistics {
        self.state.lock().statistics
    }

    /// Whether the commit policy asks for a commit now.
    pub fn should_commit(&self) -> bool {
        self.state.lock().policy.should_commit()
    }

    fn stage_upload<T: Serialize + ?Sized>(&self, item: &T, operation: IndexOperation) -> Result<()> {
        let fields = match serde_json::to_value(item) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(SearchError::InvalidArgument(format!(
                    "document must be a field map, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(SearchError::InvalidArgument(e.to_string())),
        };

        let mut fields = self.format_fields(fields)?;
        let key = match key_of(&fields) {
            Some(key) => key,
            None => {
                let unique_field = self.translator.index_field_name(BUILTIN_UNIQUE_ID_FIELD, FieldUsage::Storage);
                match fields.get(&unique_field).and_then(Value::as_str) {
                    Some(unique_id) => {
                        let key = hash_unique_id(unique_id);
                        fields.insert(CLOUD_UNIQUE_ID_FIELD.to_string(), Value::String(key.clone()));
                        key
                    }
                    None => {
                        warn!(
                            index = %self.index_name,
                            "Staging document without '{}' or '{}', the service decides on it",
                            CLOUD_UNIQUE_ID_FIELD,
                            unique_field
                        );
                        String::new()
                    }
                }
            }
        };

        self.enqueue(CloudSearchDocument::upload(fields));
        self.record(operation, &key);
        Ok(())
    }

    /// Coerce scalar and string-list fields toward their declared types.
    fn format_fields(&self, fields: Map<String, Value>) -> Result<Map<String, Value>> {
        fields
            .into_iter()
            .map(|(name, value)| {
                let structured = match &value {
                    Value::Object(_) => true,
                    Value::Array(items) => !items.iter().all(Value::is_string),
                    _ => false,
                };
                if structured {
                    return Ok((name, value));
                }
                let formatted = self
                    .formatter
                    .format_value_for_index_storage(&FieldValue::from_json(&value), &name)?;
                Ok((name, formatted.to_json()))
            })
            .collect()
    }

    async fn lookup_keys(&self, query: &CompiledQuery) -> Result<Vec<String>> {
        match self.executor.execute(query).await? {
            QueryOutcome::Results(results) => Ok(results.hits.iter().filter_map(|h| key_of(&h.fields)).collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn stage_deletes(&self, keys: Vec<String>) -> usize {
        let count = keys.len();
        for key in keys {
            self.enqueue(CloudSearchDocument::delete(key.clone()));
            self.record(IndexOperation::DeleteUnique, &key);
        }
        count
    }

    fn enqueue(&self, document: CloudSearchDocument) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(seq, document);
        metrics::set_pending_documents(&self.index_name, self.pending.len());
    }

    fn take_one(&self) -> Option<CloudSearchDocument> {
        let key = self.pending.iter().next().map(|entry| *entry.key())?;
        self.pending.remove(&key).map(|(_, document)| document)
    }

    fn record(&self, operation: IndexOperation, payload: &str) {
        let mut state = self.state.lock();
        match operation {
            IndexOperation::Add => state.statistics.added += 1,
            IndexOperation::Update => state.statistics.updated += 1,
            IndexOperation::DeleteUnique => state.statistics.deleted_unique += 1,
        }
        state.policy.index_modified(&self.index_name, payload, operation);
    }
}

fn key_of(fields: &Map<String, Value>) -> Option<String> {
    fields.get(CLOUD_UNIQUE_ID_FIELD).and_then(Value::as_str).map(str::to_owned)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::formatter::CloudIndexFieldStorageValueFormatter;
    use crate::indexing::{ModificationCountPolicy, NullCommitPolicyExecutor, SearchAction};
    use crate::query::CloudQueryMapper;
    use crate::schema::{DefaultFieldNameTranslator, IndexSchema, SchemaAccessor};
    use crate::transport::InMemorySearchService;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingEvents {
        raised: Mutex<Vec<&'static str>>,
    }

    impl IndexingEvents for RecordingEvents {
        fn raise(&self, event: IndexingEvent, _index_name: &str) {
            self.raised.lock().push(event.name());
        }
    }

    fn context_with(
        service: Arc<InMemorySearchService>,
        config: CloudSearchConfig,
        events: Arc<dyn IndexingEvents>,
        policy: Box<dyn CommitPolicyExecutor>,
    ) -> UpdateContext {
        let schema: Arc<dyn SchemaAccessor> = Arc::new(
            IndexSchema::new()
                .key(CLOUD_UNIQUE_ID_FIELD)
                .string("s_id")
                .string("s_uniqueid")
                .string("title")
                .int64("age")
                .string("template"),
        );
        let translator: Arc<dyn FieldNameTranslator> = Arc::new(DefaultFieldNameTranslator);
        let formatter: Arc<dyn ValueFormatter> = Arc::new(CloudIndexFieldStorageValueFormatter::new(schema.clone()));
        UpdateContext::new(UpdateContextParts {
            service,
            mapper: Arc::new(CloudQueryMapper::new(schema, translator.clone(), formatter.clone())),
            formatter,
            translator,
            policy,
            events,
            config,
        })
    }

    fn context(service: Arc<InMemorySearchService>, batch_size: usize) -> UpdateContext {
        context_with(
            service,
            CloudSearchConfig { batch_size, ..Default::default() },
            Arc::new(RecordingEvents::default()),
            Box::new(NullCommitPolicyExecutor),
        )
    }

    fn page(i: usize) -> Value {
        json!({ "s_key": format!("k{}", i), "title": format!("Page {}", i), "age": "30" })
    }

    #[tokio::test]
    async fn test_commit_issues_ceil_n_over_b_posts() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service.clone(), 3);
        for i in 0..7 {
            ctx.add_document(&page(i)).unwrap();
        }
        assert_eq!(ctx.pending_len(), 7);
        assert_eq!(ctx.statistics().added, 7);

        ctx.commit().await.unwrap();

        assert_eq!(service.posted_batches().len(), 3);
        assert_eq!(ctx.pending_len(), 0);
        assert_eq!(service.len(), 7);
        assert_eq!(ctx.statistics(), ContextOperationStatistics::default());
    }

    #[tokio::test]
    async fn test_fields_formatted_toward_schema() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service.clone(), 10);
        ctx.add_document(&page(1)).unwrap();
        ctx.commit().await.unwrap();
        assert_eq!(service.document("k1").unwrap()["age"], json!(30));
    }

    #[tokio::test]
    async fn test_failed_post_requeues_and_keeps_statistics() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        service.fail_post_at(1, TransportError::Status { status: 503, message: "busy".into() });
        let ctx = context(service.clone(), 2);
        for i in 0..5 {
            ctx.add_document(&page(i)).unwrap();
        }
        let before = ctx.statistics();

        let err = ctx.commit().await.unwrap_err();
        match err {
            SearchError::PartialCommitFailure { requeued, ref index, .. } => {
                assert_eq!(requeued, 2);
                assert_eq!(index, "pages");
            }
            other => panic!("Expected PartialCommitFailure, got {:?}", other),
        }

        // First batch landed; the failed batch plus the rest are pending
        assert_eq!(service.posted_batches().len(), 1);
        assert_eq!(ctx.pending_len(), 3);
        assert_eq!(ctx.statistics(), before);

        ctx.commit().await.unwrap();
        assert_eq!(ctx.pending_len(), 0);
        assert_eq!(service.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_by_unique_id_hashes_key() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service, 10);
        ctx.delete_by_unique_id("abc").unwrap();
        let pending = ctx.pending_documents();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].action, SearchAction::Delete);
        assert_eq!(pending[0].key(), Some("900150983cd24fb0d6963f7d28e17f72"));
        assert_eq!(ctx.statistics().deleted_unique, 1);
    }

    #[tokio::test]
    async fn test_add_rejects_non_map() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service, 10);
        assert!(matches!(ctx.add_document(&json!([1, 2])), Err(SearchError::InvalidArgument(_))));
        assert!(matches!(ctx.add_document(&json!("title")), Err(SearchError::InvalidArgument(_))));
        assert_eq!(ctx.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_keyless_document_is_staged_as_is() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service, 10);
        ctx.add_document(&json!({"title": "x"})).unwrap();
        let pending = ctx.pending_documents();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key(), None);
        assert_eq!(pending[0].fields.get("title"), Some(&json!("x")));
        assert_eq!(ctx.statistics().added, 1);
    }

    #[tokio::test]
    async fn test_key_derived_from_unique_id() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = context(service, 10);
        ctx.update_document(&json!({"s_uniqueid": "abc", "title": "x"})).unwrap();
        let pending = ctx.pending_documents();
        assert_eq!(pending[0].key(), Some(hash_unique_id("abc").as_str()));
        assert_eq!(ctx.statistics().updated, 1);
    }

    #[tokio::test]
    async fn test_delete_by_id_lookup() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        service.respond_with_rows(vec![json!({"s_key": "k1"}), json!({"s_key": "k2"})], 2);
        let ctx = context(service.clone(), 10);

        let staged = ctx.delete_by_id(&FieldValue::from("item-1")).await.unwrap();
        assert_eq!(staged, 2);
        let expr = service.last_expression().unwrap();
        assert!(expr.starts_with("&$filter=s_id eq 'item-1'&$select=s_key"));
        assert!(ctx.pending_documents().iter().all(|d| d.action == SearchAction::Delete));
    }

    #[tokio::test]
    async fn test_delete_by_id_without_index_is_noop() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        service.set_index_exists(false);
        let ctx = context(service, 10);
        assert_eq!(ctx.delete_by_id(&FieldValue::from("item-1")).await.unwrap(), 0);
        assert_eq!(ctx.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_id_transport_failure_propagates() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        service.fail_next_search(TransportError::Timeout);
        let ctx = context(service, 10);
        assert!(ctx.delete_by_id(&FieldValue::from("item-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_criteria_pages_through_matches() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        service.respond_with_rows(vec![json!({"s_key": "a"}), json!({"s_key": "b"})], 3);
        service.respond_with_rows(vec![json!({"s_key": "c"})], 3);
        let config = CloudSearchConfig { max_page_size: 2, ..Default::default() };
        let ctx = context_with(service.clone(), config, Arc::new(RecordingEvents::default()), Box::new(NullCommitPolicyExecutor));

        let staged = ctx
            .delete_by_criteria(&[("template".into(), "news".into()), ("age".into(), FieldValue::Int(30))])
            .await
            .unwrap();
        assert_eq!(staged, 3);

        let expressions = service.expressions();
        assert_eq!(expressions.len(), 2);
        assert!(expressions[0].starts_with("&$filter=(template eq 'news') and (age eq 30)&$select=s_key&$top=2"));
        assert!(expressions[1].contains("&$skip=2"));
    }

    #[tokio::test]
    async fn test_delete_by_criteria_requires_criteria() {
        let ctx = context(Arc::new(InMemorySearchService::new("pages")), 10);
        assert!(matches!(ctx.delete_by_criteria(&[]).await, Err(SearchError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_commit_events_and_policy() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let events = Arc::new(RecordingEvents::default());
        let ctx = context_with(
            service,
            CloudSearchConfig::default(),
            events.clone(),
            Box::new(ModificationCountPolicy::new(2)),
        );
        ctx.add_document(&page(1)).unwrap();
        assert!(!ctx.should_commit());
        ctx.delete_by_unique_id("x").unwrap();
        assert!(ctx.should_commit());

        ctx.commit().await.unwrap();
        assert!(!ctx.should_commit());
        assert_eq!(*events.raised.lock(), vec!["indexing:committing", "indexing:committed"]);
    }

    #[tokio::test]
    async fn test_empty_commit_skips_the_committed_tail() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let events = Arc::new(RecordingEvents::default());
        let ctx = context_with(
            service.clone(),
            CloudSearchConfig::default(),
            events.clone(),
            Box::new(ModificationCountPolicy::new(1)),
        );

        ctx.commit().await.unwrap();
        assert_eq!(*events.raised.lock(), vec!["indexing:committing"]);
        assert!(service.posted_batches().is_empty());

        ctx.add_document(&page(1)).unwrap();
        assert!(ctx.should_commit());
        ctx.commit().await.unwrap();
        assert!(!ctx.should_commit());
        ctx.commit().await.unwrap();
        assert_eq!(
            *events.raised.lock(),
            vec!["indexing:committing", "indexing:committing", "indexing:committed", "indexing:committing"]
        );
        assert_eq!(service.posted_batches().len(), 1);
        assert_eq!(ctx.statistics(), ContextOperationStatistics::default());
    }

    #[tokio::test]
    async fn test_concurrent_staging() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let ctx = Arc::new(context(service.clone(), 50));
        let mut handles = Vec::new();
        for t in 0..4 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    ctx.add_document(&page(t * 100 + i)).unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(ctx.pending_len(), 100);
        assert_eq!(ctx.statistics().added, 100);
        ctx.commit().await.unwrap();
        assert_eq!(service.len(), 100);
        assert_eq!(service.posted_batches().len(), 2);
    }

    #[test]
    fn test_parallel_options_and_processed() {
        let service = Arc::new(InMemorySearchService::new("pages"));
        let config = CloudSearchConfig {
            parallel_indexing_enabled: true,
            parallel_indexing_core_limit: 4,
            ..Default::default()
        };
        let ctx = context_with(service, config, Arc::new(RecordingEvents::default()), Box::new(NullCommitPolicyExecutor));
        assert!(ctx.is_parallel());
        assert_eq!(ctx.parallel_options().max_degree_of_parallelism, Some(4));
        assert!(!ctx.is_processed("u1"));
        ctx.mark_processed("u1");
        assert!(ctx.is_processed("u1"));
        ctx.optimize();
    }
}

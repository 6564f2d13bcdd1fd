// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Integration tests for the search provider.
//!
//! Everything runs against [`InMemorySearchService`], which records every
//! expression sent and applies posted batches to an in-memory store.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//! - `happy_*` - Normal operation: query compilation, paging, commits
//! - `failure_*` - Failure scenarios: failed POSTs, transport errors, retry

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use cloud_search_provider::indexing::ModificationCountPolicy;
use cloud_search_provider::query::{FacetRequest, QueryNode, QueryTree};
use cloud_search_provider::transport::{InMemorySearchService, RetryConfig, RetryingSearchService};
use cloud_search_provider::{
    hash_unique_id, CloudSearchConfig, CloudSearchProviderIndex, FieldValue, IndexSchema, QueryOutcome, SearchError,
    TransportError,
};

// =============================================================================
// Helpers
// =============================================================================

fn schema() -> Arc<IndexSchema> {
    Arc::new(
        IndexSchema::new()
            .key("s_key")
            .string("s_id")
            .string("s_uniqueid")
            .string("title")
            .int64("age")
            .string("template")
            .boolean("hidden")
            .string_collection("tags"),
    )
}

fn provider(service: Arc<InMemorySearchService>, config: CloudSearchConfig) -> CloudSearchProviderIndex {
    CloudSearchProviderIndex::builder(service, schema()).config(config).build()
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        factor: 2.0,
        max_attempts: 3,
    }
}

// =============================================================================
// Happy Path Tests - Query compilation and paging
// =============================================================================

#[tokio::test]
async fn happy_filter_take_skip_reconciles_visible_rows() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let rows: Vec<_> = (0..7).map(|i| json!({ "s_key": format!("k{}", i), "age": 31 + i })).collect();
    service.respond_with_rows(rows, 12);

    let index = provider(service.clone(), CloudSearchConfig::default());
    let tree = QueryTree::builder().filter(QueryNode::gt("age", 30)).take(5).skip(2).build();
    let outcome = index.create_search_context().query(&tree).await.unwrap();

    let expr = service.last_expression().unwrap();
    assert_eq!(expr, "&$filter=age gt 30&$top=5&$skip=2&queryType=full&$count=true");

    let QueryOutcome::Results(page) = outcome else { panic!("Expected rows") };
    assert_eq!(page.hits.len(), 5);
    assert_eq!(page.total_count, 12);
}

#[tokio::test]
async fn happy_logical_composition_and_ordering() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let search = provider(service.clone(), CloudSearchConfig::default()).create_search_context();

    let tree = QueryTree::builder()
        .filter(QueryNode::eq("Template", "news").or(QueryNode::between("age", 18, 65, Default::default())))
        .filter(QueryNode::is("hidden", false).negate())
        .order_by("Age", true)
        .select(vec!["title".into()])
        .build();
    let compiled = search.map(&tree).unwrap();
    let expr = search.optimize_expression(&compiled);

    assert!(expr.starts_with("&$filter="));
    assert!(expr.contains("template eq 'news'"));
    assert!(expr.contains("age gt 18 and age lt 65"));
    assert!(expr.contains(" or "));
    assert!(expr.contains("&$orderby=age desc"));
    assert!(expr.contains("&$select=title"));
}

#[tokio::test]
async fn happy_unknown_field_matches_nothing_without_remote_call() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let search = provider(service.clone(), CloudSearchConfig::default()).create_search_context();

    let tree = QueryTree::builder().filter(QueryNode::eq("no_such_field", "x")).build();
    let outcome = search.query(&tree).await.unwrap();

    let QueryOutcome::Results(page) = outcome else { panic!("Expected rows") };
    assert!(page.hits.is_empty());
    assert!(service.expressions().is_empty());
}

#[tokio::test]
async fn happy_count_uses_total_not_page() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.respond_with(r#"{"@odata.count": 4200, "value": []}"#);
    let search = provider(service.clone(), CloudSearchConfig::default()).create_search_context();

    let outcome = search.query(&QueryTree::builder().skip(200).count().build()).await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Count(4000)));
    assert!(service.last_expression().unwrap().contains("&$top=0"));
}

#[tokio::test]
async fn happy_facets_with_filter_and_min_count() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.respond_with(
        json!({
            "@odata.count": 10,
            "@search.facets": { "tags": [
                { "value": "rust", "count": 7 },
                { "value": "go", "count": 1 }
            ]},
            "value": []
        })
        .to_string(),
    );
    let config = CloudSearchConfig { facet_bucket_count: Some(5), ..Default::default() };
    let search = provider(service.clone(), config).create_search_context();

    let tree = QueryTree::builder()
        .facet(FacetRequest::new("tags").with_filter_values(vec!["rust".into()]).with_min_count(2))
        .get_facets()
        .build();
    let outcome = search.query(&tree).await.unwrap();

    let expr = service.last_expression().unwrap();
    assert!(expr.contains("&facet=tags,count:5"));
    assert!(expr.contains("tags/any(t: search.in(t, 'rust', '|'))"));

    let QueryOutcome::Facets(facets) = outcome else { panic!("Expected facets") };
    let tags = facets.get("tags").unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "rust");
}

#[tokio::test]
async fn happy_element_at_reads_one_row() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.respond_with_rows(vec![json!({ "s_key": "k7", "title": "Seventh" })], 20);
    let search = provider(service.clone(), CloudSearchConfig::default()).create_search_context();

    let outcome = search.query(&QueryTree::builder().skip(3).element_at(4, false).build()).await.unwrap();
    let expr = service.last_expression().unwrap();
    assert!(expr.contains("&$top=1"));
    assert!(expr.contains("&$skip=7"));

    let hit = outcome.hit().unwrap();
    assert_eq!(hit.get("title"), Some(&json!("Seventh")));
}

#[tokio::test]
async fn happy_missing_index_reads_as_empty() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.set_index_exists(false);
    let search = provider(service, CloudSearchConfig::default()).create_search_context();

    let outcome = search.query(&QueryTree::builder().count().build()).await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Count(0)));
}

#[tokio::test]
async fn happy_concurrent_queries_share_the_index() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let index = Arc::new(provider(service.clone(), CloudSearchConfig::default()));

    let update = index.create_update_context();
    for i in 0..25 {
        update.add_document(&json!({ "s_key": format!("k{:02}", i), "age": i })).unwrap();
    }
    update.commit().await.unwrap();

    let queries = (0..5).map(|i| {
        let index = index.clone();
        async move {
            let tree = QueryTree::builder().skip(i * 5).take(5).build();
            index.create_search_context().query(&tree).await
        }
    });
    let outcomes = futures::future::join_all(queries).await;

    assert_eq!(service.expressions().len(), 5);
    for outcome in outcomes {
        let QueryOutcome::Results(page) = outcome.unwrap() else { panic!("Expected rows") };
        assert_eq!(page.hits.len(), 5);
        assert_eq!(page.total_count, 25);
    }
}

// =============================================================================
// Happy Path Tests - Document pipeline
// =============================================================================

#[tokio::test]
async fn happy_commit_posts_ceil_n_over_b_batches() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let index = provider(service.clone(), CloudSearchConfig { batch_size: 4, ..Default::default() });
    let update = index.create_update_context();

    for i in 0..10 {
        update.add_document(&json!({ "s_uniqueid": format!("item-{}", i), "title": "t" })).unwrap();
    }
    update.commit().await.unwrap();

    let batches = service.posted_batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 10);
    assert_eq!(service.len(), 10);
    assert!(service.document(&hash_unique_id("item-3")).is_some());
    assert_eq!(update.pending_len(), 0);
}

#[tokio::test]
async fn happy_delete_by_unique_id_removes_hashed_key() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let index = provider(service.clone(), CloudSearchConfig::default());

    let update = index.create_update_context();
    update.add_document(&json!({ "s_uniqueid": "item://home/1", "title": "x" })).unwrap();
    update.commit().await.unwrap();
    assert_eq!(service.len(), 1);

    update.delete_by_unique_id("item://home/1").unwrap();
    update.commit().await.unwrap();
    assert!(service.is_empty());

    let payload = service.posted_batches().last().unwrap().to_payload().unwrap();
    let body: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(body["value"][0]["@search.action"], "delete");
    assert_eq!(body["value"][0]["s_key"], json!(hash_unique_id("item://home/1")));
}

#[tokio::test]
async fn happy_delete_by_id_selects_key_and_stages_deletes() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.respond_with_rows(vec![json!({ "s_key": "a" }), json!({ "s_key": "b" })], 2);
    let update = provider(service.clone(), CloudSearchConfig::default()).create_update_context();

    let staged = update.delete_by_id(&FieldValue::id("page-1")).await.unwrap();
    assert_eq!(staged, 2);
    assert!(service.last_expression().unwrap().contains("&$select=s_key"));
    assert_eq!(update.statistics().deleted_unique, 2);
}

#[tokio::test]
async fn happy_commit_policy_per_session() {
    let service = Arc::new(InMemorySearchService::new("web"));
    let index = CloudSearchProviderIndex::builder(service, schema())
        .commit_policy(Box::new(ModificationCountPolicy::new(3)))
        .build();

    let update = index.create_update_context();
    for i in 0..3 {
        assert!(!update.should_commit());
        update.delete_by_unique_id(&format!("u{}", i)).unwrap();
    }
    assert!(update.should_commit());
    update.commit().await.unwrap();
    assert!(!update.should_commit());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[tokio::test]
async fn failure_post_requeues_batch_and_recovers() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.fail_next_posts(1, TransportError::Status { status: 503, message: "throttled".into() });
    let update = provider(service.clone(), CloudSearchConfig { batch_size: 3, ..Default::default() })
        .create_update_context();

    for i in 0..5 {
        update.add_document(&json!({ "s_key": format!("k{}", i) })).unwrap();
    }

    let err = update.commit().await.unwrap_err();
    assert!(matches!(err, SearchError::PartialCommitFailure { requeued: 3, .. }));
    assert_eq!(update.pending_len(), 5);
    assert_eq!(update.statistics().added, 5);
    assert!(service.is_empty());

    update.commit().await.unwrap();
    assert_eq!(service.len(), 5);
    assert_eq!(update.statistics().total(), 0);
}

#[tokio::test]
async fn failure_search_error_surfaces() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.fail_next_search(TransportError::Backend("index corrupt".into()));
    let search = provider(service, CloudSearchConfig::default()).create_search_context();

    let err = search.query(&QueryTree::builder().build()).await.unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}

#[tokio::test]
async fn failure_malformed_envelope() {
    let service = Arc::new(InMemorySearchService::new("web"));
    service.respond_with("not json at all");
    let search = provider(service, CloudSearchConfig::default()).create_search_context();

    let err = search.query(&QueryTree::builder().build()).await.unwrap_err();
    assert!(matches!(err, SearchError::MalformedResponse(_)));
}

#[tokio::test]
async fn failure_transient_post_absorbed_by_retry() {
    let memory = Arc::new(InMemorySearchService::new("web"));
    memory.fail_next_posts(2, TransportError::Timeout);
    let service = Arc::new(RetryingSearchService::new(memory.clone()).with_post_retry(fast_retry()));

    let index = CloudSearchProviderIndex::builder(service, schema()).build();
    let update = index.create_update_context();
    update.add_document(&json!({ "s_key": "k1" })).unwrap();
    update.commit().await.unwrap();

    assert_eq!(memory.len(), 1);
    assert_eq!(memory.posted_batches().len(), 1);
}

#[tokio::test]
async fn failure_permanent_post_not_retried() {
    let memory = Arc::new(InMemorySearchService::new("web"));
    memory.fail_post_at(0, TransportError::Status { status: 400, message: "bad field".into() });
    memory.fail_post_at(1, TransportError::Status { status: 400, message: "bad field".into() });
    let service = Arc::new(RetryingSearchService::new(memory.clone()).with_post_retry(fast_retry()));

    let update = CloudSearchProviderIndex::builder(service, schema()).build().create_update_context();
    update.add_document(&json!({ "s_key": "k1" })).unwrap();

    assert!(update.commit().await.is_err());
    assert_eq!(update.pending_len(), 1);
    // Second scripted failure still queued: the decorator gave up after one try
    assert!(update.commit().await.is_err());
    update.commit().await.unwrap();
    assert_eq!(memory.len(), 1);
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory search service.
//!
//! Posted batches are applied to a `DashMap` keyed by `s_key`. Searches are
//! answered from the script queue first; with an empty script the store is
//! returned whole, paged by `$skip` / `$top`. Filters are not evaluated.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use super::SearchService;
use crate::error::TransportError;
use crate::indexing::{CloudBatch, SearchAction};
use crate::schema::CLOUD_UNIQUE_ID_FIELD;

pub struct InMemorySearchService {
    index_name: String,
    documents: DashMap<String, Map<String, Value>>,
    scripted: Mutex<VecDeque<Result<Option<String>, TransportError>>>,
    expressions: Mutex<Vec<String>>,
    batches: Mutex<Vec<CloudBatch>>,
    post_failures: Mutex<VecDeque<(usize, TransportError)>>,
    posts_seen: Mutex<usize>,
    index_exists: AtomicBool,
}

impl InMemorySearchService {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            documents: DashMap::new(),
            scripted: Mutex::new(VecDeque::new()),
            expressions: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            post_failures: Mutex::new(VecDeque::new()),
            posts_seen: Mutex::new(0),
            index_exists: AtomicBool::new(true),
        }
    }

    /// Queue a raw response body for the next search.
    pub fn respond_with(&self, body: impl Into<String>) {
        self.scripted.lock().push_back(Ok(Some(body.into())));
    }

    /// Queue an envelope built from rows and a count.
    pub fn respond_with_rows(&self, rows: Vec<Value>, count: u64) {
        self.respond_with(json!({ "@odata.count": count, "value": rows }).to_string());
    }

    /// Queue a transport failure for the next search.
    pub fn fail_next_search(&self, error: TransportError) {
        self.scripted.lock().push_back(Err(error));
    }

    /// Fail the next `count` POSTs with `error`.
    pub fn fail_next_posts(&self, count: usize, error: TransportError) {
        let seen = *self.posts_seen.lock();
        let mut failures = self.post_failures.lock();
        for i in 0..count {
            failures.push_back((seen + i, error.clone()));
        }
    }

    /// Fail the POST with this zero-based ordinal (counting every POST seen).
    pub fn fail_post_at(&self, ordinal: usize, error: TransportError) {
        self.post_failures.lock().push_back((ordinal, error));
    }

    /// While false, searches return `Ok(None)` (no backing index yet).
    pub fn set_index_exists(&self, exists: bool) {
        self.index_exists.store(exists, Ordering::SeqCst);
    }

    /// Every expression searched, in order.
    pub fn expressions(&self) -> Vec<String> {
        self.expressions.lock().clone()
    }

    pub fn last_expression(&self) -> Option<String> {
        self.expressions.lock().last().cloned()
    }

    /// Every batch accepted, in order.
    pub fn posted_batches(&self) -> Vec<CloudBatch> {
        self.batches.lock().clone()
    }

    /// Stored document by remote key.
    pub fn document(&self, key: &str) -> Option<Map<String, Value>> {
        self.documents.get(key).map(|r| r.value().clone())
    }

    /// Insert a document directly, bypassing the batch path.
    pub fn seed(&self, document: Map<String, Value>) {
        if let Some(key) = document.get(CLOUD_UNIQUE_ID_FIELD).and_then(Value::as_str) {
            self.documents.insert(key.to_string(), document);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn apply(&self, batch: &CloudBatch) {
        for doc in &batch.documents {
            let Some(key) = doc.key() else { continue };
            match doc.action {
                SearchAction::Delete => {
                    self.documents.remove(key);
                }
                SearchAction::Upload => {
                    self.documents.insert(key.to_string(), doc.fields.clone());
                }
                SearchAction::Merge | SearchAction::MergeOrUpload => {
                    let mut entry = self.documents.entry(key.to_string()).or_default();
                    for (k, v) in &doc.fields {
                        entry.insert(k.clone(), v.clone());
                    }
                }
            }
        }
    }

    fn page_from_store(&self, expression: &str) -> String {
        let mut rows: Vec<Map<String, Value>> = self.documents.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| {
            let key = |m: &Map<String, Value>| m.get(CLOUD_UNIQUE_ID_FIELD).and_then(Value::as_str).map(str::to_owned);
            key(a).cmp(&key(b))
        });
        let total = rows.len();
        let skip = query_param(expression, "$skip").unwrap_or(0);
        let top = query_param(expression, "$top").unwrap_or(total);
        let page: Vec<Value> = rows.into_iter().skip(skip).take(top).map(Value::Object).collect();
        json!({ "@odata.count": total, "value": page }).to_string()
    }
}

fn query_param(expression: &str, name: &str) -> Option<usize> {
    let marker = format!("&{}=", name);
    let start = expression.find(&marker)? + marker.len();
    let digits: String = expression[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[async_trait]
impl SearchService for InMemorySearchService {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn search(&self, expression: &str) -> Result<Option<String>, TransportError> {
        self.expressions.lock().push(expression.to_string());

        if let Some(scripted) = self.scripted.lock().pop_front() {
            return scripted;
        }
        if !self.index_exists.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.page_from_store(expression)))
    }

    async fn post_documents(&self, batch: &CloudBatch) -> Result<(), TransportError> {
        let ordinal = {
            let mut seen = self.posts_seen.lock();
            let ordinal = *seen;
            *seen += 1;
            ordinal
        };

        {
            let mut failures = self.post_failures.lock();
            if let Some(pos) = failures.iter().position(|(at, _)| *at == ordinal) {
                if let Some((_, error)) = failures.remove(pos) {
                    return Err(error);
                }
            }
        }

        self.apply(batch);
        self.batches.lock().push(batch.clone());
        Ok(())
    }
}

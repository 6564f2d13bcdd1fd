// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result envelope parsing and result shapes.
//!
//! The service answers with:
//!
//! ```json
//! {
//!   "@odata.count": 12,
//!   "@search.facets": { "tags": [ { "value": "news", "count": 4 } ] },
//!   "value": [ { "@search.score": 1.0, "s_key": "…", "title": "…" } ]
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::{Result, SearchError};
use crate::query::tree::FacetRequest;

const SCORE_FIELD: &str = "@search.score";

/// One result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchHit {
    pub fields: Map<String, Value>,
    /// Relevance score, when the service reported one
    pub score: Option<f64>,
}

impl SearchHit {
    fn from_row(mut fields: Map<String, Value>) -> Self {
        let score = fields.remove(SCORE_FIELD).and_then(|v| v.as_f64());
        Self { fields, score }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Shape the row into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

/// One facet bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetValue {
    pub name: String,
    pub count: u64,
}

/// Facet buckets keyed by remote field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacetResults {
    categories: HashMap<String, Vec<FacetValue>>,
}

impl FacetResults {
    pub fn get(&self, field: &str) -> Option<&[FacetValue]> {
        self.categories.get(field).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[FacetValue])> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Drop buckets below each request's minimum count.
    pub fn apply_min_counts(&mut self, requests: &[FacetRequest]) {
        for request in requests {
            if let Some(buckets) = self.categories.get_mut(&request.field) {
                buckets.retain(|b| b.count >= request.min_count);
            }
        }
    }
}

/// Parsed page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// `@odata.count`; 0 when absent
    pub total_count: u64,
    pub facets: FacetResults,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Option<Vec<Map<String, Value>>>,
    #[serde(rename = "@odata.count", default)]
    count: Option<i64>,
    #[serde(rename = "@search.facets", default)]
    facets: Option<HashMap<String, Vec<WireBucket>>>,
}

#[derive(Deserialize)]
struct WireBucket {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    count: u64,
}

impl SearchResults {
    /// Parse a raw response body.
    pub fn parse(body: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(body)?;
        let Some(rows) = envelope.value else {
            return Err(SearchError::MalformedResponse("response has no value array".to_string()));
        };

        let total_count = match envelope.count {
            Some(n) if n < 0 => {
                return Err(SearchError::MalformedResponse(format!("negative @odata.count {}", n)))
            }
            Some(n) => n as u64,
            None => 0,
        };

        let categories = envelope
            .facets
            .unwrap_or_default()
            .into_iter()
            .map(|(field, buckets)| {
                let values = buckets
                    .into_iter()
                    .map(|b| FacetValue { name: bucket_name(&b.value), count: b.count })
                    .collect();
                (field, values)
            })
            .collect();

        Ok(Self {
            hits: rows.into_iter().map(SearchHit::from_row).collect(),
            total_count,
            facets: FacetResults { categories },
        })
    }
}

fn bucket_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Result of executing a compiled query, shaped by its terminal method.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// No terminal method: the visible page
    Results(SearchResults),
    /// `Count`
    Count(u64),
    /// `Any`
    Any(bool),
    /// `First` / `Single` (None only when a default is allowed)
    Single(Option<SearchHit>),
    /// `ElementAt`: the element row sits at slot `index`, other slots are unset
    Element { index: usize, slots: Vec<Option<SearchHit>> },
    /// `GetFacets`
    Facets(FacetResults),
}

impl QueryOutcome {
    /// The single row of a `First`/`Single`/`ElementAt` outcome.
    pub fn hit(&self) -> Option<&SearchHit> {
        match self {
            Self::Single(hit) => hit.as_ref(),
            Self::Element { index, slots } => slots.get(*index).and_then(Option::as_ref),
            _ => None,
        }
    }
}

/// Lazily materialized typed rows. Finite and single pass.
#[derive(Debug)]
pub struct SearchHits<T> {
    hits: std::vec::IntoIter<SearchHit>,
    total_count: u64,
    facets: FacetResults,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SearchHits<T> {
    pub(crate) fn new(results: SearchResults) -> Self {
        Self {
            hits: results.hits.into_iter(),
            total_count: results.total_count,
            facets: results.facets,
            _marker: PhantomData,
        }
    }

    /// Total matches reported by the service.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn facets(&self) -> &FacetResults {
        &self.facets
    }
}

impl<T: DeserializeOwned> Iterator for SearchHits<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.hits.next().map(|hit| hit.deserialize())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.hits.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const BODY: &str = r#"{
        "@odata.count": 12,
        "@search.facets": { "tags": [ { "value": "news", "count": 4 }, { "value": "blog", "count": 1 } ] },
        "value": [
            { "@search.score": 1.5, "s_key": "a", "title": "Home" },
            { "s_key": "b", "title": "About" }
        ]
    }"#;

    #[test]
    fn test_parse_envelope() {
        let results = SearchResults::parse(BODY).unwrap();
        assert_eq!(results.total_count, 12);
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].score, Some(1.5));
        assert!(results.hits[0].get(SCORE_FIELD).is_none());
        assert_eq!(results.facets.get("tags").unwrap().len(), 2);
    }

    #[test]
    fn test_count_without_rows() {
        let results = SearchResults::parse(r#"{"@odata.count": 40, "value": []}"#).unwrap();
        assert_eq!(results.total_count, 40);
        assert!(results.hits.is_empty());
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(SearchResults::parse("not json"), Err(SearchError::MalformedResponse(_))));
        assert!(matches!(
            SearchResults::parse(r#"{"@odata.count": -1, "value": []}"#),
            Err(SearchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_envelope_is_malformed() {
        assert!(matches!(
            SearchResults::parse(r#"{"error":{"code":"InvalidRequest","message":"boom"}}"#),
            Err(SearchError::MalformedResponse(_))
        ));
        assert!(matches!(
            SearchResults::parse(r#"{"@odata.count": 3}"#),
            Err(SearchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_min_count_filtering() {
        let mut results = SearchResults::parse(BODY).unwrap();
        results.facets.apply_min_counts(&[FacetRequest::new("tags").with_min_count(2)]);
        let tags = results.facets.get("tags").unwrap();
        assert_eq!(tags, &[FacetValue { name: "news".into(), count: 4 }]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        s_key: String,
        title: String,
    }

    #[test]
    fn test_typed_hits_single_pass() {
        let mut hits: SearchHits<Page> = SearchHits::new(SearchResults::parse(BODY).unwrap());
        assert_eq!(hits.total_count(), 12);
        let first = hits.next().unwrap().unwrap();
        assert_eq!(first, Page { s_key: "a".into(), title: "Home".into() });
        assert!(hits.next().is_some());
        assert!(hits.next().is_none());
    }

    #[test]
    fn test_element_outcome_hit() {
        let hit = SearchHit::default();
        let outcome = QueryOutcome::Element { index: 2, slots: vec![None, None, Some(hit.clone())] };
        assert_eq!(outcome.hit(), Some(&hit));
    }
}

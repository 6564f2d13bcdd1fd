// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic cloud-search-provider usage example.
//!
//! Demonstrates:
//! 1. Building a provider index over the in-memory search service
//! 2. Staging and committing 10 documents in batches of 4
//! 3. Compiling and running a filtered, paged query
//! 4. Count / first / facets terminals
//! 5. Deleting by unique id
//! 6. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use cloud_search_provider::query::{FacetRequest, QueryNode, QueryTree};
use cloud_search_provider::transport::InMemorySearchService;
use cloud_search_provider::{CloudSearchConfig, CloudSearchProviderIndex, IndexSchema, QueryOutcome};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures everything the crate emits)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║         cloud-search-provider: Basic Usage Example            ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure the provider index
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Configuring provider index...");

    let service = Arc::new(InMemorySearchService::new("web"));
    let schema = Arc::new(
        IndexSchema::new()
            .key("s_key")
            .string("s_uniqueid")
            .string("title")
            .int64("age")
            .string_collection("tags"),
    );
    let config = CloudSearchConfig {
        batch_size: 4,
        enable_search_debug: true,
        ..Default::default()
    };
    let index = CloudSearchProviderIndex::builder(service.clone(), schema).config(config).build();
    println!("   └─ Index: {}", index.name());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Stage and commit documents
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Staging 10 documents...");
    let update = index.create_update_context();
    for i in 0..10 {
        let tags = if i % 3 == 0 { vec!["news"] } else { vec!["blog"] };
        update.add_document(&json!({
            "s_uniqueid": format!("item://home/{}", i),
            "title": format!("Page {}", i),
            "age": 25 + i,
            "tags": tags,
        }))?;
    }
    println!("   └─ Pending: {} ({})", update.pending_len(), update.statistics());

    update.commit().await?;
    println!("   ✅ Committed in {} POSTs, {} documents stored", service.posted_batches().len(), service.len());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Filtered, paged query
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Querying age > 30, skip 2, take 5...");
    let search = index.create_search_context();
    let tree = QueryTree::builder()
        .filter(QueryNode::gt("age", 30))
        .order_by("age", true)
        .skip(2)
        .take(5)
        .build();
    let compiled = search.map(&tree)?;
    println!("   └─ Expression: {}", search.optimize_expression(&compiled));

    if let QueryOutcome::Results(page) = search.execute(&compiled).await? {
        println!("   └─ {} rows of {} total", page.hits.len(), page.total_count);
        for hit in &page.hits {
            println!("      └─ {}", hit.get("title").unwrap_or(&json!(null)));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Terminal methods
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🧮 Terminals:");
    let count = search.query(&QueryTree::builder().count().build()).await?;
    println!("   └─ Count: {:?}", count);

    let first = search.query(&QueryTree::builder().first(true).build()).await?;
    println!("   └─ First: {:?}", first.hit().and_then(|h| h.get("title")));

    let facets = search
        .query(&QueryTree::builder().facet(FacetRequest::new("tags")).get_facets().build())
        .await?;
    println!("   └─ Facets: {:?}", facets);

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Delete by unique id
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🗑️  Deleting item://home/0...");
    update.delete_by_unique_id("item://home/0")?;
    update.commit().await?;
    println!("   └─ Documents stored: {}", service.len());

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Dump raw metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name().to_string();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name, label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name, label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name, label_str, count, sum));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }

    if !gauges.is_empty() {
        println!("   ├─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.2}", name, labels, value);
        }
    }

    if !histograms.is_empty() {
        println!("   └─ Histograms (distributions)");
        for (name, labels, count, sum) in &histograms {
            let avg = if *count > 0 { sum / *count as f64 } else { 0.0 };
            println!("   │  └─ {}{} count={} sum={:.4} avg={:.4}", name, labels, count, sum, avg);
        }
    }

    if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
}

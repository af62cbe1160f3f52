//! Store Integration Tests
//!
//! Content records and the identifier registry through the public API.

use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use canvasflow::core::StoreConfig;
use canvasflow::store::{RecordMetadata, Store};

fn store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path(), &StoreConfig::default()).unwrap();
    (dir, store)
}

fn metadata(query: &str) -> RecordMetadata {
    RecordMetadata {
        query: Some(query.to_string()),
        generator_type: Some("document".to_string()),
        document_format: Some("md".to_string()),
        ..RecordMetadata::default()
    }
}

// ============================================================================
// Save & Retrieve
// ============================================================================

#[test]
fn test_save_then_retrieve() {
    let (_dir, store) = store();
    let mut passed = metadata("write an invoice report");
    passed.extra.insert("author".to_string(), serde_json::json!("finance"));

    store.content().save("invoice_report", "# Invoices", passed.clone(), false).unwrap();
    let record = store.content().retrieve("invoice_report");

    assert_eq!(record.content, "# Invoices");
    assert_eq!(record.metadata.query, passed.query);
    assert_eq!(record.metadata.generator_type, passed.generator_type);
    assert_eq!(record.metadata.document_format, passed.document_format);
    assert_eq!(record.metadata.extra.get("author"), passed.extra.get("author"));
    assert!(record.metadata.created_at.is_some());
    assert!(record.metadata.timestamp.is_some());
}

#[test]
fn test_update_preserves_created_at_and_history() {
    let (_dir, store) = store();
    let mut first = metadata("write an invoice report");
    first.extra.insert("reviewer".to_string(), serde_json::json!("sam"));
    store.content().save("invoice_report", "v1", first, false).unwrap();
    let created = store.content().retrieve("invoice_report").metadata.created_at;

    let update = RecordMetadata {
        query: Some("add a totals row".to_string()),
        ..RecordMetadata::default()
    };
    store.content().save("invoice_report", "v2", update.clone(), true).unwrap();
    store.content().save("invoice_report", "v3", update, true).unwrap();

    let record = store.content().retrieve("invoice_report");
    assert_eq!(record.content, "v3");
    assert_eq!(record.metadata.created_at, created);
    assert_eq!(
        record.metadata.query_history,
        vec!["write an invoice report".to_string(), "add a totals row".to_string()]
    );
    // Fields the update did not set are carried forward
    assert_eq!(record.metadata.document_format.as_deref(), Some("md"));
    assert_eq!(record.metadata.extra.get("reviewer"), Some(&serde_json::json!("sam")));
}

#[test]
fn test_never_saved_is_empty() {
    let (_dir, store) = store();
    let record = store.content().retrieve("nothing_here");
    assert!(record.is_empty());
    assert!(store.content().resolve("nothing_here").is_none());
}

// ============================================================================
// Layered Lookup
// ============================================================================

#[test]
fn test_approximate_identifiers() {
    let (_dir, store) = store();
    store.content().save("invoice_report", "# Invoices", metadata("q"), false).unwrap();

    assert_eq!(store.content().retrieve("invoice-report").content, "# Invoices");
    assert_eq!(store.content().retrieve("Invoice Report").content, "# Invoices");
    assert_eq!(store.content().retrieve("invoice").content, "# Invoices");
    assert!(store.content().retrieve("zzz_unrelated_xyz").is_empty());
}

#[test]
fn test_legacy_files_resolve() {
    let (_dir, store) = store();
    let dir = store.content().dir();
    fs::write(dir.join("chart.py"), "plot()").unwrap();
    fs::write(dir.join("broken.json"), "not json {").unwrap();

    let found = store.content().resolve("chart").unwrap();
    assert_eq!(found.key, "chart.py");
    assert_eq!(found.record.content, "plot()");
    assert_eq!(found.record.metadata.code_language.as_deref(), Some("py"));

    assert_eq!(store.content().retrieve("broken").content, "not json {");
}

#[test]
fn test_concurrent_updates_keep_every_query() {
    let (_dir, store) = store();
    let store = Arc::new(store);
    store.content().save("shared", "v0", metadata("start"), false).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let update = RecordMetadata {
                    query: Some(format!("change {i}")),
                    ..RecordMetadata::default()
                };
                store.content().save("shared", &format!("v{i}"), update, true).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.content().retrieve("shared");
    assert_eq!(record.metadata.query_history.len(), 9);
    assert_eq!(record.metadata.query_history[0], "start");
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_bounded_and_unique() {
    let (_dir, store) = store();
    let registry = store.registry();

    for i in 0..15 {
        registry.record(&format!("artifact_{i}")).unwrap();
    }
    registry.record("artifact_12").unwrap();

    let recent = registry.recent();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0], "artifact_12");
    assert_eq!(recent[1], "artifact_14");
    assert_eq!(recent.iter().filter(|id| *id == "artifact_12").count(), 1);
    assert_eq!(registry.last_identifier().as_deref(), Some("artifact_12"));
}

#[test]
fn test_registry_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Store::open(dir.path(), &StoreConfig::default()).unwrap();
        store.registry().record("sales_chart").unwrap();
    }

    let store = Store::open(dir.path(), &StoreConfig::default()).unwrap();
    assert_eq!(store.registry().recent(), vec!["sales_chart".to_string()]);
    assert!(store.registry().read().last_timestamp.is_some());
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Behaviour every backend must share.

use super::create_test_stores;
use crate::{Batch, CommitReceipt, Document, SqliteStore, StoreError, DocumentStore};
use serde_json::json;

#[test]
fn test_get_missing_document_returns_none() {
    for (name, store) in create_test_stores() {
        let found: Option<Document> = store.get("orders", "o-1").unwrap();
        assert!(found.is_none(), "{name}");
    }
}

#[test]
fn test_set_then_get_round_trip() {
    for (name, store) in create_test_stores() {
        store
            .set("orders", "o-1", json!({"address": "Calle 10 # 4-20"}), false)
            .unwrap();

        let doc: Document = store.get("orders", "o-1").unwrap().unwrap();
        assert_eq!(doc.body, json!({"address": "Calle 10 # 4-20"}), "{name}");
        assert_eq!(doc.revision, 1, "{name}");
    }
}

#[test]
fn test_every_write_increments_revision() {
    for (name, store) in create_test_stores() {
        store.set("orders", "o-1", json!({"a": 1}), false).unwrap();
        store.set("orders", "o-1", json!({"b": 2}), true).unwrap();
        let receipt: CommitReceipt = store.update("orders", "o-1", json!({"c": 3})).unwrap();

        assert_eq!(receipt.revision("orders", "o-1"), Some(3), "{name}");
        let doc: Document = store.get("orders", "o-1").unwrap().unwrap();
        assert_eq!(doc.body, json!({"a": 1, "b": 2, "c": 3}), "{name}");
    }
}

#[test]
fn test_set_without_merge_replaces_body() {
    for (name, store) in create_test_stores() {
        store.set("orders", "o-1", json!({"a": 1}), false).unwrap();
        store.set("orders", "o-1", json!({"b": 2}), false).unwrap();

        let doc: Document = store.get("orders", "o-1").unwrap().unwrap();
        assert_eq!(doc.body, json!({"b": 2}), "{name}");
    }
}

#[test]
fn test_update_missing_document_is_not_found() {
    for (name, store) in create_test_stores() {
        let result: Result<CommitReceipt, StoreError> =
            store.update("orders", "ghost", json!({"confirmed": true}));
        assert!(matches!(result, Err(StoreError::NotFound { .. })), "{name}");
    }
}

#[test]
fn test_delete_is_idempotent() {
    for (name, store) in create_test_stores() {
        store.set("orders", "o-1", json!({}), false).unwrap();
        store.delete("orders", "o-1").unwrap();
        store.delete("orders", "o-1").unwrap();

        assert!(store.get("orders", "o-1").unwrap().is_none(), "{name}");
    }
}

#[test]
fn test_list_is_scoped_and_ordered_by_key() {
    for (name, store) in create_test_stores() {
        store.set("orders", "o-2", json!({}), false).unwrap();
        store.set("orders", "o-1", json!({}), false).unwrap();
        store.set("archive", "2024-01-01", json!({}), false).unwrap();

        let keys: Vec<String> = store
            .list("orders")
            .unwrap()
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec![String::from("o-1"), String::from("o-2")], "{name}");
    }
}

#[test]
fn test_failed_batch_applies_nothing() {
    for (name, store) in create_test_stores() {
        store.set("orders", "o-1", json!({"a": 1}), false).unwrap();

        let mut batch: Batch = Batch::new();
        batch
            .set("archive", "2024-01-01", json!({"orders": []}), false)
            .delete("orders", "o-1")
            .update("novedades", "missing-unit", json!({"entries": []}));
        let result: Result<CommitReceipt, StoreError> = store.commit(batch);

        assert!(result.is_err(), "{name}");
        assert!(store.get("orders", "o-1").unwrap().is_some(), "{name}");
        assert!(store.get("archive", "2024-01-01").unwrap().is_none(), "{name}");
    }
}

#[test]
fn test_stale_precondition_rejects_whole_batch() {
    for (name, store) in create_test_stores() {
        store
            .set("system", "cierre", json!({"last_rollover_date": "2024-01-01"}), false)
            .unwrap();
        let read: Document = store.get("system", "cierre").unwrap().unwrap();

        // A competing writer moves the document on.
        store
            .set("system", "cierre", json!({"last_rollover_date": "2024-01-02"}), false)
            .unwrap();

        let mut batch: Batch = Batch::new();
        batch
            .require_unchanged("system", "cierre", Some(&read))
            .set("archive", "2024-01-01", json!({}), false)
            .set("system", "cierre", json!({"last_rollover_date": "2024-01-02"}), false);
        let result: Result<CommitReceipt, StoreError> = store.commit(batch);

        assert!(
            matches!(result, Err(StoreError::PreconditionFailed { .. })),
            "{name}"
        );
        assert!(store.get("archive", "2024-01-01").unwrap().is_none(), "{name}");
    }
}

#[test]
fn test_sqlite_in_memory_databases_are_isolated() {
    let first: SqliteStore = SqliteStore::new_in_memory().unwrap();
    let second: SqliteStore = SqliteStore::new_in_memory().unwrap();

    first.set("orders", "o-1", json!({}), false).unwrap();

    assert!(second.get("orders", "o-1").unwrap().is_none());
}

#[test]
fn test_sqlite_file_store_persists_across_reopen() {
    let path: std::path::PathBuf = std::env::temp_dir().join(format!(
        "despacho-store-test-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let store: SqliteStore = SqliteStore::new_with_file(&path).unwrap();
        store
            .set("system", "cierre", json!({"last_rollover_date": "2024-01-02"}), false)
            .unwrap();
    }

    let reopened: SqliteStore = SqliteStore::new_with_file(&path).unwrap();
    let doc: Document = reopened.get("system", "cierre").unwrap().unwrap();
    assert_eq!(doc.body, json!({"last_rollover_date": "2024-01-02"}));

    drop(reopened);
    let _ = std::fs::remove_file(&path);
}

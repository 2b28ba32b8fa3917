// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-process document store.
//!
//! Used by unit tests and by deployments that do not need durability. A
//! single mutex serializes commits, which makes every batch atomic.

use crate::batch::{Batch, CommitReceipt, plan_changes};
use crate::document::{ChangeKind, Document, DocumentChange};
use crate::error::StoreError;
use crate::feed::{ChangeFeed, Subscription, SubscriptionFilter};
use crate::DocumentStore;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

type Documents = BTreeMap<(String, String), Document>;

/// A document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
    pub(crate) feed: ChangeFeed,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Documents>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable(String::from("Memory store lock poisoned")))
    }

    /// Plans and applies a batch under one lock.
    fn apply(&self, batch: &Batch) -> Result<Vec<DocumentChange>, StoreError> {
        let mut documents = self.lock()?;
        let changes: Vec<DocumentChange> = plan_changes(batch, |collection, key| {
            Ok(documents
                .get(&(collection.to_string(), key.to_string()))
                .cloned())
        })?;

        for change in &changes {
            let slot = (change.collection.clone(), change.key.clone());
            match change.kind {
                ChangeKind::Deleted => {
                    documents.remove(&slot);
                }
                ChangeKind::Created | ChangeKind::Updated => {
                    if let Some(document) = change.document() {
                        documents.insert(slot, document);
                    }
                }
            }
        }
        drop(documents);
        Ok(changes)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let documents = self.lock()?;
        Ok(documents
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let documents = self.lock()?;
        Ok(documents
            .values()
            .filter(|d| d.collection == collection)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        let changes: Vec<DocumentChange> = self.apply(&batch)?;
        debug!(changes = changes.len(), "Committed batch to memory store");
        self.feed.publish(&changes);
        Ok(CommitReceipt { changes })
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        self.feed.subscribe(filter)
    }
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Document store adapter for the dispatch system.
//!
//! The rollover core is written against [`DocumentStore`], a small
//! document-oriented interface: keyed JSON documents grouped in collections,
//! atomic multi-document batches guarded by revision preconditions, and a
//! change feed.
//!
//! ## Backends
//!
//! - [`MemoryStore`] keeps documents in process. Used by unit tests.
//! - [`SqliteStore`] persists documents in a single `SQLite` table through
//!   Diesel, with embedded migrations. A batch runs inside one immediate
//!   transaction.
//!
//! ## Concurrency
//!
//! The store is the only shared mutable resource. Callers that perform a
//! read-modify-write cycle record the revision they read as a
//! [`Precondition`] on the batch; a concurrent writer makes the commit fail
//! with [`StoreError::PreconditionFailed`] and nothing is written.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod batch;
mod document;
mod error;
mod feed;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use batch::{Batch, CommitReceipt, Operation, Precondition, plan_changes};
pub use document::{ChangeKind, Document, DocumentChange, merge_json};
pub use error::StoreError;
pub use feed::{ChangeFeed, Subscription, SubscriptionFilter};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde_json::Value;

/// Abstract document store.
///
/// Implementations must make [`DocumentStore::commit`] all-or-nothing and
/// publish changes to subscribers only after a commit succeeds.
pub trait DocumentStore: Send + Sync {
    /// Reads one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Reads every document in a collection, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Checks the batch preconditions and applies its operations atomically.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` or `NotFound` without writing anything,
    /// or a backend error if the commit could not be completed.
    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError>;

    /// Opens a change subscription.
    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription;

    /// Returns false for stores that may apply only part of a failed batch.
    ///
    /// Callers use this to decide whether a failed commit must be checked
    /// for partial effects.
    fn guarantees_atomic_commit(&self) -> bool {
        true
    }

    /// Creates or replaces a document, merging fields when `merge` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(
        &self,
        collection: &str,
        key: &str,
        body: Value,
        merge: bool,
    ) -> Result<CommitReceipt, StoreError> {
        let mut batch: Batch = Batch::new();
        batch.set(collection, key, body, merge);
        self.commit(batch)
    }

    /// Merges fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist.
    fn update(
        &self,
        collection: &str,
        key: &str,
        fields: Value,
    ) -> Result<CommitReceipt, StoreError> {
        let mut batch: Batch = Batch::new();
        batch.update(collection, key, fields);
        self.commit(batch)
    }

    /// Removes a document. Removing a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn delete(&self, collection: &str, key: &str) -> Result<CommitReceipt, StoreError> {
        let mut batch: Batch = Batch::new();
        batch.delete(collection, key);
        self.commit(batch)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, key)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection)
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        (**self).commit(batch)
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        (**self).subscribe(filter)
    }

    fn guarantees_atomic_commit(&self) -> bool {
        (**self).guarantees_atomic_commit()
    }
}

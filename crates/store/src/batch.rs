// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Multi-document batches.
//!
//! A batch is a list of preconditions followed by a list of operations.
//! Committing a batch either applies every operation or none of them. The
//! planning step in this module is shared by every backend so that merge,
//! update and revision semantics are identical regardless of storage.

use crate::document::{ChangeKind, Document, DocumentChange, merge_json};
use crate::error::StoreError;
use serde_json::Value;
use std::collections::HashMap;

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Creates or replaces a document. With `merge`, fields are merged into
    /// an existing body instead of replacing it.
    Set {
        collection: String,
        key: String,
        body: Value,
        merge: bool,
    },
    /// Merges fields into a document that must already exist.
    Update {
        collection: String,
        key: String,
        fields: Value,
    },
    /// Removes a document. Deleting a missing document is not an error.
    Delete { collection: String, key: String },
}

impl Operation {
    fn target(&self) -> (&str, &str) {
        match self {
            Self::Set {
                collection, key, ..
            }
            | Self::Update {
                collection, key, ..
            }
            | Self::Delete { collection, key } => (collection, key),
        }
    }
}

/// A condition checked against committed state before any operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The document must be at exactly `expected` revision; `None` means
    /// it must not exist.
    Revision {
        collection: String,
        key: String,
        expected: Option<u64>,
    },
}

/// An atomic group of writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    preconditions: Vec<Precondition>,
    operations: Vec<Operation>,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the document to be at `expected` revision at commit time.
    pub fn require_revision(
        &mut self,
        collection: &str,
        key: &str,
        expected: Option<u64>,
    ) -> &mut Self {
        self.preconditions.push(Precondition::Revision {
            collection: collection.to_string(),
            key: key.to_string(),
            expected,
        });
        self
    }

    /// Requires the document to be unchanged since `document` was read.
    pub fn require_unchanged(
        &mut self,
        collection: &str,
        key: &str,
        document: Option<&Document>,
    ) -> &mut Self {
        self.require_revision(collection, key, document.map(|d| d.revision))
    }

    pub fn set(&mut self, collection: &str, key: &str, body: Value, merge: bool) -> &mut Self {
        self.operations.push(Operation::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            body,
            merge,
        });
        self
    }

    pub fn update(&mut self, collection: &str, key: &str, fields: Value) -> &mut Self {
        self.operations.push(Operation::Update {
            collection: collection.to_string(),
            key: key.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, key: &str) -> &mut Self {
        self.operations.push(Operation::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
        self
    }

    #[must_use]
    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.operations.len()
    }
}

/// The outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Every change applied, in operation order.
    pub changes: Vec<DocumentChange>,
}

impl CommitReceipt {
    /// Returns the revision a document ended at, or `None` if the batch left
    /// it deleted or never touched it.
    #[must_use]
    pub fn revision(&self, collection: &str, key: &str) -> Option<u64> {
        self.changes
            .iter()
            .rev()
            .find(|c| c.collection == collection && c.key == key)
            .and_then(|c| (c.kind != ChangeKind::Deleted).then_some(c.revision))
    }
}

type DocKey = (String, String);

/// Works out the changes a batch makes against committed state.
///
/// `read` loads committed documents. Later operations see the effect of
/// earlier ones in the same batch. Nothing is written here; the caller
/// applies the returned changes in order inside its own atomic section.
///
/// # Errors
///
/// Returns `PreconditionFailed` if a precondition does not hold, `NotFound`
/// if an update targets a missing document, or any error from `read`.
pub fn plan_changes<F>(batch: &Batch, mut read: F) -> Result<Vec<DocumentChange>, StoreError>
where
    F: FnMut(&str, &str) -> Result<Option<Document>, StoreError>,
{
    for precondition in &batch.preconditions {
        let Precondition::Revision {
            collection,
            key,
            expected,
        } = precondition;
        let actual: Option<u64> = read(collection, key)?.map(|d| d.revision);
        if actual != *expected {
            return Err(StoreError::PreconditionFailed {
                collection: collection.clone(),
                key: key.clone(),
                expected: *expected,
                actual,
            });
        }
    }

    let mut staged: HashMap<DocKey, Option<Document>> = HashMap::new();
    let mut changes: Vec<DocumentChange> = Vec::with_capacity(batch.operations.len());

    for operation in &batch.operations {
        let (collection, key) = operation.target();
        let slot: DocKey = (collection.to_string(), key.to_string());
        let current: Option<Document> = match staged.get(&slot) {
            Some(doc) => doc.clone(),
            None => read(collection, key)?,
        };

        let change: DocumentChange = match operation {
            Operation::Set { body, merge, .. } => {
                let next_body: Value = match (&current, *merge) {
                    (Some(existing), true) => {
                        let mut merged: Value = existing.body.clone();
                        merge_json(&mut merged, body);
                        merged
                    }
                    _ => body.clone(),
                };
                written(collection, key, current.as_ref(), next_body)
            }
            Operation::Update { fields, .. } => {
                let Some(existing) = current.as_ref() else {
                    return Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        key: key.to_string(),
                    });
                };
                let mut merged: Value = existing.body.clone();
                merge_json(&mut merged, fields);
                written(collection, key, current.as_ref(), merged)
            }
            Operation::Delete { .. } => match current {
                Some(existing) => DocumentChange {
                    collection: collection.to_string(),
                    key: key.to_string(),
                    kind: ChangeKind::Deleted,
                    revision: existing.revision,
                    body: None,
                },
                None => continue,
            },
        };

        staged.insert(slot, change.document());
        changes.push(change);
    }

    Ok(changes)
}

fn written(collection: &str, key: &str, current: Option<&Document>, body: Value) -> DocumentChange {
    let (kind, revision): (ChangeKind, u64) = current.map_or((ChangeKind::Created, 1), |d| {
        (ChangeKind::Updated, d.revision + 1)
    });
    DocumentChange {
        collection: collection.to_string(),
        key: key.to_string(),
        kind,
        revision,
        body: Some(body),
    }
}

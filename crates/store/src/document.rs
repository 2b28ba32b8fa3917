// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The collection the document lives in.
    pub collection: String,
    /// The document key, unique within its collection.
    pub key: String,
    /// The document body.
    pub body: Value,
    /// Write counter, starting at 1 and increased by every write.
    pub revision: u64,
}

impl Document {
    /// Decodes the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            StoreError::Serialization(format!(
                "{}/{} could not be decoded: {e}",
                self.collection, self.key
            ))
        })
    }
}

/// The kind of change a commit made to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One document change produced by a committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub collection: String,
    pub key: String,
    pub kind: ChangeKind,
    /// Revision after the change; for deletions, the revision that was removed.
    pub revision: u64,
    /// Body after the change; `None` for deletions.
    pub body: Option<Value>,
}

impl DocumentChange {
    /// Returns the resulting document, or `None` for a deletion.
    #[must_use]
    pub fn document(&self) -> Option<Document> {
        self.body.as_ref().map(|body| Document {
            collection: self.collection.clone(),
            key: self.key.clone(),
            body: body.clone(),
            revision: self.revision,
        })
    }
}

/// Merges `patch` into `target`.
///
/// Objects merge field by field, recursively. Any other patch value replaces
/// the target outright.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (name, value) in fields {
                match existing.get_mut(name) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        existing.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::collections::AUDIT;
use crate::error::CoreError;
use crate::ledger::store_serialization;
use despacho_audit::AuditEvent;
use despacho_store::{Batch, DocumentStore};
use std::sync::Arc;

/// Persisted audit trail of rollover-family operations.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn DocumentStore>,
}

impl AuditLog {
    #[must_use]
    pub const fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds the event to `batch` under a key no other event uses, returning
    /// that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the event cannot be
    /// serialized.
    pub fn stage(&self, batch: &mut Batch, event: &AuditEvent) -> Result<String, CoreError> {
        let base: String = event.storage_key();
        let mut key: String = base.clone();
        let mut suffix: u32 = 1;
        while self.store.get(AUDIT, &key)?.is_some() {
            suffix += 1;
            key = format!("{base}-{suffix}");
        }
        let body = serde_json::to_value(event).map_err(store_serialization)?;
        batch
            .require_revision(AUDIT, &key, None)
            .set(AUDIT, &key, body, false);
        Ok(key)
    }

    /// Returns every audit event, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an event is
    /// malformed.
    pub fn list(&self) -> Result<Vec<AuditEvent>, CoreError> {
        let mut events: Vec<AuditEvent> = self
            .store
            .list(AUDIT)?
            .into_iter()
            .map(|doc| {
                let event: AuditEvent = doc.decode()?;
                Ok(event.with_id(doc.key))
            })
            .collect::<Result<Vec<AuditEvent>, CoreError>>()?;
        events.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.event_id.cmp(&a.event_id))
        });
        Ok(events)
    }
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Archive snapshots of closed dispatch days.

use crate::collections::ARCHIVE;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::ledger::store_serialization;
use crate::retry::with_optimistic_retry;
use chrono::{DateTime, NaiveTime, Utc};
use despacho_domain::{
    ArchiveDateSummary, ArchiveSnapshot, DispatchDate, DomainError, Order,
    normalize_archived_order,
};
use despacho_store::{Batch, Document, DocumentStore, StoreError};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Keys under which legacy snapshots kept their order list.
const ORDER_LIST_ALIASES: [&str; 2] = ["orders", "pedidos"];

/// Result of staging a snapshot merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSnapshot {
    pub snapshot: ArchiveSnapshot,
    /// Orders newly added to the snapshot.
    pub added: usize,
}

/// Snapshots keyed by dispatch date.
#[derive(Clone)]
pub struct ArchiveStore {
    store: Arc<dyn DocumentStore>,
    config: EngineConfig,
}

impl ArchiveStore {
    #[must_use]
    pub const fn new(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Writes a snapshot of `orders` for `date`.
    ///
    /// Without `merge` the date must not have been archived yet. With
    /// `merge` the orders are appended to any existing snapshot, skipping
    /// ids already present.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadyArchived` on the strict path when a
    /// snapshot exists, or a store error.
    pub fn write_snapshot(
        &self,
        date: DispatchDate,
        orders: Vec<Order>,
        merge: bool,
        archived_at: DateTime<Utc>,
    ) -> Result<ArchiveSnapshot, CoreError> {
        let key: String = date.to_string();
        if !merge {
            let snapshot: ArchiveSnapshot = ArchiveSnapshot::new(date, orders, archived_at);
            let body = serde_json::to_value(&snapshot).map_err(store_serialization)?;
            let mut batch: Batch = Batch::new();
            batch
                .require_revision(ARCHIVE, &key, None)
                .set(ARCHIVE, &key, body, false);
            return match self.store.commit(batch) {
                Ok(_) => {
                    info!(%date, orders = snapshot.order_count, "Archive snapshot written");
                    Ok(snapshot)
                }
                Err(StoreError::PreconditionFailed { .. }) => {
                    Err(DomainError::AlreadyArchived(key).into())
                }
                Err(err) => Err(err.into()),
            };
        }

        let what: String = format!("{ARCHIVE}/{date}");
        let staged: StagedSnapshot =
            with_optimistic_retry(&what, self.config.max_commit_attempts, || {
                let mut batch: Batch = Batch::new();
                let staged: StagedSnapshot =
                    self.stage_merge(&mut batch, date, orders.clone(), archived_at)?;
                self.store.commit(batch)?;
                Ok(staged)
            })?;
        info!(
            %date,
            added = staged.added,
            orders = staged.snapshot.order_count,
            "Archive snapshot merged"
        );
        Ok(staged.snapshot)
    }

    /// Adds a merge of `orders` into the snapshot for `date` to `batch`,
    /// guarded by the revision read.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing snapshot cannot be read.
    pub fn stage_merge(
        &self,
        batch: &mut Batch,
        date: DispatchDate,
        orders: Vec<Order>,
        archived_at: DateTime<Utc>,
    ) -> Result<StagedSnapshot, CoreError> {
        let key: String = date.to_string();
        let existing: Option<Document> = self.store.get(ARCHIVE, &key)?;
        let (snapshot, added): (ArchiveSnapshot, usize) = match &existing {
            Some(doc) => {
                let mut snapshot: ArchiveSnapshot = decode_snapshot(doc, date)?;
                for id in snapshot.diverging_ids(&orders) {
                    warn!(
                        %date,
                        order_id = %id,
                        "Order already archived with a different body; keeping the archived copy"
                    );
                }
                let added: usize = snapshot.merge(orders, archived_at);
                (snapshot, added)
            }
            None => {
                let snapshot: ArchiveSnapshot = ArchiveSnapshot::new(date, orders, archived_at);
                let added: usize = snapshot.order_count;
                (snapshot, added)
            }
        };
        let body = serde_json::to_value(&snapshot).map_err(store_serialization)?;
        batch
            .require_unchanged(ARCHIVE, &key, existing.as_ref())
            .set(ARCHIVE, &key, body, false);
        Ok(StagedSnapshot { snapshot, added })
    }

    /// Reads the snapshot for `date`, normalizing legacy order records.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ArchiveNotFound` if the date was never archived.
    pub fn read_snapshot(&self, date: DispatchDate) -> Result<ArchiveSnapshot, CoreError> {
        let document: Document = self
            .store
            .get(ARCHIVE, &date.to_string())?
            .ok_or(CoreError::ArchiveNotFound(date))?;
        decode_snapshot(&document, date)
    }

    /// Returns the revision of the snapshot for `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn revision(&self, date: DispatchDate) -> Result<Option<u64>, CoreError> {
        Ok(self
            .store
            .get(ARCHIVE, &date.to_string())?
            .map(|d| d.revision))
    }

    /// Lists archived dates, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_dates(&self) -> Result<Vec<ArchiveDateSummary>, CoreError> {
        let mut summaries: Vec<ArchiveDateSummary> = Vec::new();
        for document in self.store.list(ARCHIVE)? {
            let Ok(date) = DispatchDate::from_str(&document.key) else {
                warn!(key = %document.key, "Skipping archive entry with a non-date key");
                continue;
            };
            summaries.push(ArchiveDateSummary {
                date,
                order_count: stored_order_count(&document.body),
            });
        }
        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summaries)
    }
}

fn order_list(body: &Value) -> Option<&Vec<Value>> {
    ORDER_LIST_ALIASES
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
}

fn stored_order_count(body: &Value) -> usize {
    body.get("order_count")
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .or_else(|| order_list(body).map(Vec::len))
        .unwrap_or(0)
}

/// Decodes a stored snapshot. Canonical documents deserialize directly;
/// anything else is rebuilt order by order.
fn decode_snapshot(
    document: &Document,
    date: DispatchDate,
) -> Result<ArchiveSnapshot, CoreError> {
    if let Ok(snapshot) = document.decode::<ArchiveSnapshot>() {
        return Ok(ArchiveSnapshot::new(date, snapshot.orders, snapshot.archived_at));
    }

    let archived_at: DateTime<Utc> = document
        .body
        .get("archived_at")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or_else(
            || date.naive().and_time(NaiveTime::MIN).and_utc(),
            |dt| dt.with_timezone(&Utc),
        );

    let orders: Vec<Order> = order_list(&document.body)
        .map(|records| {
            records
                .iter()
                .map(|record| normalize_archived_order(record, archived_at))
                .collect::<Result<Vec<Order>, DomainError>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(ArchiveSnapshot::new(date, orders, archived_at))
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-unit daily trip counters.
//!
//! One document per dispatch date holds every unit's count for that day.
//! Counts never go below zero.

use crate::clock::Clock;
use crate::collections::COUNTERS;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::retry::with_optimistic_retry;
use despacho_domain::{DispatchDate, UnitId};
use despacho_store::{Batch, Document, DocumentStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The counter document for one dispatch date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterBucket {
    pub date: DispatchDate,
    #[serde(default)]
    pub units: BTreeMap<UnitId, u32>,
}

impl CounterBucket {
    #[must_use]
    pub const fn empty(date: DispatchDate) -> Self {
        Self {
            date,
            units: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn count(&self, unit: &UnitId) -> u32 {
        self.units.get(unit).copied().unwrap_or(0)
    }

    /// Adds one trip, returning the new count.
    pub fn increment(&mut self, unit: &UnitId) -> u32 {
        let slot: &mut u32 = self.units.entry(unit.clone()).or_insert(0);
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Removes one trip, returning the new count. Stays at zero.
    pub fn decrement(&mut self, unit: &UnitId) -> u32 {
        let slot: &mut u32 = self.units.entry(unit.clone()).or_insert(0);
        *slot = slot.saturating_sub(1);
        *slot
    }
}

/// A counter bucket together with the document it was read from.
#[derive(Debug, Clone)]
pub struct BucketRead {
    pub document: Option<Document>,
    pub bucket: CounterBucket,
}

impl BucketRead {
    /// Adds a write of the (modified) bucket to `batch`, guarded by the
    /// revision that was read.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket cannot be serialized.
    pub fn stage_write(&self, batch: &mut Batch) -> Result<(), CoreError> {
        let key: String = self.bucket.date.to_string();
        let body = serde_json::to_value(&self.bucket).map_err(store_serialization)?;
        batch
            .require_unchanged(COUNTERS, &key, self.document.as_ref())
            .set(COUNTERS, &key, body, false);
        Ok(())
    }
}

pub(crate) fn store_serialization(err: serde_json::Error) -> CoreError {
    CoreError::Store(err.into())
}

/// Daily counter ledger.
#[derive(Clone)]
pub struct CounterLedger {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl CounterLedger {
    #[must_use]
    pub const fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn today(&self) -> DispatchDate {
        self.config.today(self.clock.now())
    }

    /// Reads the bucket for `date`, empty if none has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the document is
    /// malformed.
    pub fn read_bucket(&self, date: DispatchDate) -> Result<BucketRead, CoreError> {
        let document: Option<Document> = self.store.get(COUNTERS, &date.to_string())?;
        let bucket: CounterBucket = match &document {
            Some(doc) => doc.decode()?,
            None => CounterBucket::empty(date),
        };
        Ok(BucketRead { document, bucket })
    }

    /// Adds one trip to `unit` for today.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or concurrent writers exhaust
    /// the retry budget.
    pub fn increment(&self, unit: &UnitId) -> Result<u32, CoreError> {
        self.increment_on(unit, self.today())
    }

    /// Removes one trip from `unit` for today, never going below zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or concurrent writers exhaust
    /// the retry budget.
    pub fn decrement(&self, unit: &UnitId) -> Result<u32, CoreError> {
        self.decrement_on(unit, self.today())
    }

    /// Adds one trip to `unit` on `date`.
    ///
    /// # Errors
    ///
    /// See [`CounterLedger::increment`].
    pub fn increment_on(&self, unit: &UnitId, date: DispatchDate) -> Result<u32, CoreError> {
        let value: u32 = self.adjust(date, |bucket| Some(bucket.increment(unit)))?;
        debug!(%unit, %date, value, "Counter incremented");
        Ok(value)
    }

    /// Removes one trip from `unit` on `date`.
    ///
    /// # Errors
    ///
    /// See [`CounterLedger::decrement`].
    pub fn decrement_on(&self, unit: &UnitId, date: DispatchDate) -> Result<u32, CoreError> {
        let value: u32 = self.adjust(date, |bucket| {
            // Already at the floor: nothing to write.
            (bucket.count(unit) > 0).then(|| bucket.decrement(unit))
        })?;
        debug!(%unit, %date, value, "Counter decremented");
        Ok(value)
    }

    /// Read-modify-write of one bucket. `change` returns `None` to skip the
    /// write, in which case the unit's current count is returned.
    fn adjust<F>(&self, date: DispatchDate, mut change: F) -> Result<u32, CoreError>
    where
        F: FnMut(&mut CounterBucket) -> Option<u32>,
    {
        let what: String = format!("{COUNTERS}/{date}");
        with_optimistic_retry(&what, self.config.max_commit_attempts, || {
            let mut read: BucketRead = self.read_bucket(date)?;
            let Some(value) = change(&mut read.bucket) else {
                return Ok(0);
            };
            let mut batch: Batch = Batch::new();
            read.stage_write(&mut batch)?;
            self.store.commit(batch)?;
            Ok(value)
        })
    }

    /// Returns every unit's count for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn counts(&self, date: DispatchDate) -> Result<BTreeMap<UnitId, u32>, CoreError> {
        Ok(self.read_bucket(date)?.bucket.units)
    }

    /// Returns every unit's count for today.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn counts_today(&self) -> Result<BTreeMap<UnitId, u32>, CoreError> {
        self.counts(self.today())
    }

    /// Clears today's bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn reset_today(&self) -> Result<(), CoreError> {
        let today: DispatchDate = self.today();
        let mut batch: Batch = Batch::new();
        stage_reset(&mut batch, today)?;
        self.store.commit(batch)?;
        info!(date = %today, "Counters reset");
        Ok(())
    }
}

/// Adds an unconditional reset of the bucket for `date` to `batch`.
///
/// # Errors
///
/// Returns an error if the empty bucket cannot be serialized.
pub fn stage_reset(batch: &mut Batch, date: DispatchDate) -> Result<(), CoreError> {
    let body = serde_json::to_value(CounterBucket::empty(date)).map_err(store_serialization)?;
    batch.set(COUNTERS, &date.to_string(), body, false);
    Ok(())
}

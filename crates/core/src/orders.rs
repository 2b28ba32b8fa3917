// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The table of currently open orders.
//!
//! Intake creates orders, operators assign and confirm them, and only a
//! rollover removes them (moving them into an archive snapshot).

use crate::clock::Clock;
use crate::collections::ORDERS;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::ledger::{BucketRead, CounterLedger, store_serialization};
use crate::retry::with_optimistic_retry;
use chrono::{DateTime, Utc};
use despacho_domain::{DispatchDate, NewOrder, Order, OrderId, UnitId, validate_new_order};
use despacho_store::{Batch, Document, DocumentStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// An open order together with the document it was read from.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order: Order,
    pub document: Document,
}

/// Open orders.
#[derive(Clone)]
pub struct OrderTable {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    ledger: CounterLedger,
    sequence: Arc<AtomicU64>,
}

impl OrderTable {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let ledger: CounterLedger = CounterLedger::new(store.clone(), clock.clone(), config);
        Self {
            store,
            clock,
            config,
            ledger,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Clients sharing a store each count from 1, so the random suffix
    /// keeps their ids apart within the same second.
    fn next_id(&self, now: DateTime<Utc>) -> OrderId {
        let seq: u64 = self.sequence.fetch_add(1, Ordering::SeqCst);
        let suffix: u16 = rand::random::<u16>();
        OrderId::new(&format!(
            "{}-{seq:04}-{suffix:04x}",
            now.format("%Y%m%d%H%M%S")
        ))
    }

    /// Creates an open, unassigned order.
    ///
    /// # Errors
    ///
    /// Returns an error if the intake data is invalid or the store write
    /// fails.
    pub fn create(&self, intake: NewOrder) -> Result<Order, CoreError> {
        validate_new_order(&intake)?;
        let now: DateTime<Utc> = self.clock.now();
        // A taken id fails the must-not-exist precondition; retry with a new one.
        let order: Order = with_optimistic_retry(ORDERS, self.config.max_commit_attempts, || {
            let order: Order = Order::from_intake(self.next_id(now), intake.clone(), now);
            let body = serde_json::to_value(&order).map_err(store_serialization)?;
            let mut batch: Batch = Batch::new();
            batch
                .require_revision(ORDERS, order.id.as_str(), None)
                .set(ORDERS, order.id.as_str(), body, false);
            self.store.commit(batch)?;
            Ok(order)
        })?;

        info!(order_id = %order.id, is_parcel = order.is_parcel, "Order created");
        Ok(order)
    }

    fn read(&self, id: &OrderId) -> Result<OpenOrder, CoreError> {
        let document: Document = self
            .store
            .get(ORDERS, id.as_str())?
            .ok_or_else(|| CoreError::OrderNotFound(id.clone()))?;
        Ok(OpenOrder {
            order: document.decode()?,
            document,
        })
    }

    /// Returns one open order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OrderNotFound` if the order is not open.
    pub fn get(&self, id: &OrderId) -> Result<Order, CoreError> {
        Ok(self.read(id)?.order)
    }

    /// Assigns an order to a unit and adjusts today's counters in the same
    /// batch: the new unit gains a trip and a previously assigned unit loses
    /// one.
    ///
    /// The caller is responsible for refusing units that are unavailable or
    /// carry active novedades.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OrderNotFound` if the order is not open, or a
    /// store error.
    pub fn assign(&self, id: &OrderId, unit: &UnitId) -> Result<Order, CoreError> {
        let what: String = format!("{ORDERS}/{id}");
        let attempts: u32 = self.config.max_commit_attempts;
        let (order, previous) = with_optimistic_retry(&what, attempts, || {
            let now: DateTime<Utc> = self.clock.now();
            let today: DispatchDate = self.config.today(now);
            let OpenOrder {
                mut order,
                document,
            } = self.read(id)?;
            let previous: Option<UnitId> = order.assign(unit.clone(), now);

            let mut batch: Batch = Batch::new();
            let body = serde_json::to_value(&order).map_err(store_serialization)?;
            batch
                .require_unchanged(ORDERS, id.as_str(), Some(&document))
                .set(ORDERS, id.as_str(), body, false);

            if previous.as_ref() != Some(unit) {
                let mut counters: BucketRead = self.ledger.read_bucket(today)?;
                if let Some(prev) = &previous {
                    counters.bucket.decrement(prev);
                }
                counters.bucket.increment(unit);
                counters.stage_write(&mut batch)?;
            }

            self.store.commit(batch)?;
            Ok((order, previous))
        })?;

        match &previous {
            Some(prev) => info!(order_id = %id, from = %prev, to = %unit, "Order reassigned"),
            None => info!(order_id = %id, %unit, "Order assigned"),
        }
        Ok(order)
    }

    /// Marks an order as confirmed by the unit.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OrderNotFound` if the order is not open, or a
    /// store error.
    pub fn confirm(&self, id: &OrderId) -> Result<Order, CoreError> {
        let what: String = format!("{ORDERS}/{id}");
        let attempts: u32 = self.config.max_commit_attempts;
        let order: Order = with_optimistic_retry(&what, attempts, || {
            let OpenOrder {
                mut order,
                document,
            } = self.read(id)?;
            order.confirm(self.clock.now());
            let body = serde_json::to_value(&order).map_err(store_serialization)?;
            let mut batch: Batch = Batch::new();
            batch
                .require_unchanged(ORDERS, id.as_str(), Some(&document))
                .set(ORDERS, id.as_str(), body, false);
            self.store.commit(batch)?;
            Ok(order)
        })?;
        info!(order_id = %id, "Order confirmed");
        Ok(order)
    }

    /// Returns every open order with its stored revision, oldest request
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a record is
    /// malformed.
    pub fn list_open_documents(&self) -> Result<Vec<OpenOrder>, CoreError> {
        let mut open: Vec<OpenOrder> = self
            .store
            .list(ORDERS)?
            .into_iter()
            .map(|document| {
                Ok(OpenOrder {
                    order: document.decode()?,
                    document,
                })
            })
            .collect::<Result<Vec<OpenOrder>, CoreError>>()?;
        open.sort_by(|a, b| {
            a.order
                .requested_at
                .cmp(&b.order.requested_at)
                .then_with(|| a.order.id.cmp(&b.order.id))
        });
        Ok(open)
    }

    /// Returns every open order, oldest request first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_open(&self) -> Result<Vec<Order>, CoreError> {
        Ok(self
            .list_open_documents()?
            .into_iter()
            .map(|open| open.order)
            .collect())
    }
}

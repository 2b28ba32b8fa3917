// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::calendar::DispatchDate;
use crate::order::Order;
use crate::types::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The archived record of every order closed on a calendar date.
///
/// Snapshots are immutable except through [`ArchiveSnapshot::merge`], which
/// appends orders stranded by an incomplete earlier rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
    /// The dispatch date the orders belong to.
    pub date: DispatchDate,
    /// Frozen copies of the archived orders.
    pub orders: Vec<Order>,
    /// Always equal to `orders.len()`.
    pub order_count: usize,
    /// When the snapshot was first written or last merged.
    pub archived_at: DateTime<Utc>,
}

impl ArchiveSnapshot {
    /// Creates a snapshot from a set of orders.
    #[must_use]
    pub fn new(date: DispatchDate, orders: Vec<Order>, archived_at: DateTime<Utc>) -> Self {
        let order_count: usize = orders.len();
        Self {
            date,
            orders,
            order_count,
            archived_at,
        }
    }

    /// Returns the ids in `orders` that are already archived with a
    /// different body. [`ArchiveSnapshot::merge`] keeps the archived copy.
    #[must_use]
    pub fn diverging_ids(&self, orders: &[Order]) -> Vec<OrderId> {
        orders
            .iter()
            .filter(|order| {
                self.orders
                    .iter()
                    .any(|archived| archived.id == order.id && archived != *order)
            })
            .map(|order| order.id.clone())
            .collect()
    }

    /// Appends orders not already present, returning how many were added.
    ///
    /// Orders are matched by id, so merging the same orders twice never
    /// duplicates them. `order_count` is recomputed.
    pub fn merge(&mut self, orders: Vec<Order>, archived_at: DateTime<Utc>) -> usize {
        let mut known: HashSet<OrderId> = self.orders.iter().map(|o| o.id.clone()).collect();
        let before: usize = self.orders.len();
        for order in orders {
            if known.insert(order.id.clone()) {
                self.orders.push(order);
            }
        }
        self.order_count = self.orders.len();
        self.archived_at = archived_at;
        self.order_count - before
    }

    /// Counts archived orders that were never assigned to a unit.
    #[must_use]
    pub fn unassigned_count(&self) -> usize {
        self.orders.iter().filter(|o| o.is_unassigned()).count()
    }

    /// Returns the listing summary for this snapshot.
    #[must_use]
    pub const fn summary(&self) -> ArchiveDateSummary {
        ArchiveDateSummary {
            date: self.date,
            order_count: self.order_count,
        }
    }
}

/// Summary row returned when listing archived dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDateSummary {
    /// The archived date.
    pub date: DispatchDate,
    /// Number of orders in the snapshot.
    pub order_count: usize,
}

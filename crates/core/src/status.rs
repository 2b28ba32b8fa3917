// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Rollover status and its short-lived cache.

use chrono::{DateTime, Utc};
use despacho_domain::DispatchDate;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of a status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverStatus {
    /// True whenever the last rollover date differs from today.
    pub needs_rollover: bool,
    pub last_rollover_date: Option<DispatchDate>,
    pub today: DispatchDate,
    /// Whether the UI should prompt the operator now. Only set when a
    /// rollover is needed and the check ran inside the window around
    /// midnight. Never used to decide whether to roll over.
    pub prompt: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedStatus {
    status: RolloverStatus,
    valid_until: DateTime<Utc>,
}

/// Cache of the last status check, keyed by the date it was computed for.
#[derive(Debug, Default)]
pub struct StatusCache {
    entry: Mutex<Option<CachedStatus>>,
}

impl StatusCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<CachedStatus>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached status if it was computed for `today` and has not
    /// expired at `now`.
    #[must_use]
    pub fn get(&self, today: DispatchDate, now: DateTime<Utc>) -> Option<RolloverStatus> {
        self.guard()
            .as_ref()
            .filter(|cached| cached.status.today == today && now < cached.valid_until)
            .map(|cached| cached.status.clone())
    }

    pub fn store(&self, status: RolloverStatus, valid_until: DateTime<Utc>) {
        *self.guard() = Some(CachedStatus {
            status,
            valid_until,
        });
    }

    /// Returns when the cached entry expires, if there is one.
    #[must_use]
    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.guard().as_ref().map(|cached| cached.valid_until)
    }

    pub fn invalidate(&self) {
        *self.guard() = None;
    }
}

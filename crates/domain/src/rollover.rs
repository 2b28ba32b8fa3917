// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Rollover state and the per-day state machine.
//!
//! ```text
//! OPEN (last_rollover_date == today)
//!   -> date rolls over ->
//! STALE (last_rollover_date != today)
//!   -> execute_rollover ->
//! OPEN (with the new today)
//! ```

use crate::calendar::DispatchDate;
use serde::{Deserialize, Serialize};

/// The phase of the current dispatch day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPhase {
    /// The day has already been closed for today.
    Open,
    /// A day boundary was crossed and the previous day is still open.
    Stale,
}

impl RolloverPhase {
    /// Returns the string representation of the phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Stale => "stale",
        }
    }
}

/// Singleton record of the last completed rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RolloverState {
    /// The date recorded by the last completed rollover.
    ///
    /// `None` means the system has never rolled over.
    pub last_rollover_date: Option<DispatchDate>,
}

impl RolloverState {
    /// Creates a state recording a completed rollover on `date`.
    #[must_use]
    pub const fn at(date: DispatchDate) -> Self {
        Self {
            last_rollover_date: Some(date),
        }
    }

    /// Returns true if the last rollover date differs from `today`.
    ///
    /// This is the accurate staleness fact; it never depends on time of day.
    #[must_use]
    pub fn needs_rollover(&self, today: DispatchDate) -> bool {
        self.last_rollover_date != Some(today)
    }

    /// Returns true if the recorded date is later than `today`.
    ///
    /// Only happens when client clocks disagree. Such a state still counts
    /// as stale but must not be closed normally.
    #[must_use]
    pub fn is_ahead_of(&self, today: DispatchDate) -> bool {
        self.last_rollover_date.is_some_and(|last| last > today)
    }

    /// Returns the phase for `today`.
    #[must_use]
    pub fn phase(&self, today: DispatchDate) -> RolloverPhase {
        if self.needs_rollover(today) {
            RolloverPhase::Stale
        } else {
            RolloverPhase::Open
        }
    }

    /// Returns the state after a rollover completed on `today`.
    ///
    /// The recorded date never moves backwards: if the stored date is ahead
    /// of `today` (clock skew between clients) it is kept.
    #[must_use]
    pub fn advanced_to(&self, today: DispatchDate) -> Self {
        let next: DispatchDate = self
            .last_rollover_date
            .map_or(today, |last| last.max(today));
        Self::at(next)
    }

    /// Returns the date whose open orders a normal rollover archives.
    ///
    /// Orders still open belong to the day that was last opened. When the
    /// system has never rolled over, the day before `today` is used.
    #[must_use]
    pub fn closing_date(&self, today: DispatchDate) -> Option<DispatchDate> {
        match self.last_rollover_date {
            Some(last) if last < today => Some(last),
            Some(_) => None,
            None => today.previous().ok(),
        }
    }
}

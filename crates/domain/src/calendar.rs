// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Calendar arithmetic for the dispatch day.
//!
//! The fleet operates on wall-clock days in a single declared timezone.
//! This module converts UTC instants into dispatch dates, computes the next
//! local midnight (the automatic rollover deadline), and evaluates the
//! presentation window around midnight in which operators are prompted to
//! close the day.
//!
//! ## Invariants
//!
//! - A dispatch date is always a local calendar date, never a UTC date
//! - The next-midnight deadline is strictly after the supplied instant
//! - DST transitions that skip local midnight resolve to the first valid
//!   instant of the new day

use crate::error::DomainError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const SECONDS_PER_DAY: i64 = 86_400;

/// A calendar date in the fleet's local timezone (`YYYY-MM-DD`).
///
/// Dispatch dates key the counter ledger, the archive store and the rollover
/// state. They order chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchDate(NaiveDate);

impl DispatchDate {
    /// Wraps a naive calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from year, month and day.
    ///
    /// # Errors
    ///
    /// Returns an error if the components do not form a valid date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DomainError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| DomainError::DateParseError {
                date_string: format!("{year:04}-{month:02}-{day:02}"),
                error: String::from("no such calendar date"),
            })
    }

    /// Returns the local dispatch date for a UTC instant.
    #[must_use]
    pub fn at(instant: DateTime<Utc>, tz: Tz) -> Self {
        Self(instant.with_timezone(&tz).date_naive())
    }

    /// Returns the wrapped naive date.
    #[must_use]
    pub const fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the previous calendar day.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is the minimum representable date.
    pub fn previous(&self) -> Result<Self, DomainError> {
        self.0
            .pred_opt()
            .map(Self)
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: format!("computing the day before {self}"),
            })
    }

    /// Returns the next calendar day.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is the maximum representable date.
    pub fn next(&self) -> Result<Self, DomainError> {
        self.0
            .succ_opt()
            .map(Self)
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: format!("computing the day after {self}"),
            })
    }
}

impl std::fmt::Display for DispatchDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DispatchDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|e| DomainError::DateParseError {
                date_string: s.to_string(),
                error: e.to_string(),
            })
    }
}

/// Parses an IANA timezone name.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimezone` if the name is unknown.
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.parse::<Tz>()
        .map_err(|_| DomainError::InvalidTimezone(name.to_string()))
}

/// Computes the next local midnight strictly after `now`.
///
/// This is the deadline for the automatic rollover timer. It is recomputed
/// after every firing instead of adding 24 hours, so DST changes never
/// accumulate drift.
///
/// # Errors
///
/// Returns an error if date arithmetic overflows or the new day has no valid
/// local instant in the first hour.
pub fn next_local_midnight(now: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, DomainError> {
    let today: DispatchDate = DispatchDate::at(now, tz);
    let tomorrow: DispatchDate = today.next()?;
    let midnight = tomorrow.naive().and_time(NaiveTime::MIN);

    // Midnight can be skipped by a DST jump (e.g. clocks go 23:59 -> 01:00).
    let resolved = tz
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: format!("resolving local midnight of {tomorrow} in {tz}"),
        })?;

    Ok(resolved.with_timezone(&Utc))
}

/// Returns true if `now` falls in the prompt window around local midnight.
///
/// The window covers the last `window` before midnight and the first
/// `window` after it. It is a presentation gate only and never decides
/// whether a rollover is actually needed.
#[must_use]
pub fn is_within_prompt_window(now: DateTime<Utc>, tz: Tz, window: Duration) -> bool {
    let window_secs: i64 = window.num_seconds().clamp(0, SECONDS_PER_DAY / 2);
    let seconds: i64 = i64::from(now.with_timezone(&tz).num_seconds_from_midnight());
    seconds >= SECONDS_PER_DAY - window_secs || seconds < window_secs
}

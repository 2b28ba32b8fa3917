// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod archive;
mod calendar;
mod error;
mod novedad;
mod order;
mod rollover;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use archive::{ArchiveDateSummary, ArchiveSnapshot};
pub use calendar::{DispatchDate, is_within_prompt_window, next_local_midnight, parse_timezone};
pub use error::DomainError;
pub use novedad::{Novedad, NovedadConfig, NovedadConfigEntry, retain_surviving};
pub use order::{NewOrder, Order, ReassignmentEntry, normalize_archived_order};
pub use rollover::{RolloverPhase, RolloverState};
pub use types::{OrderId, Unit, UnitId};
pub use validation::{
    validate_new_order, validate_novedad_code, validate_unit, validate_unit_id,
};

pub use chrono_tz::Tz;

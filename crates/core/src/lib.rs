// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Daily rollover and counter-consistency engine.
//!
//! Every component is written against [`despacho_store::DocumentStore`]
//! and shares it through an `Arc`. The store is the only shared mutable
//! resource; components hold no locks across calls and protect their
//! read-modify-write cycles with revision preconditions.

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
mod audit_log;
mod clock;
pub mod collections;
mod config;
mod error;
mod ledger;
mod novedades;
mod orders;
mod retry;
mod rollover;
mod scheduler;
mod status;
mod units;

#[cfg(test)]
mod tests;

pub use archive::{ArchiveStore, StagedSnapshot};
pub use audit_log::AuditLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_MAX_COMMIT_ATTEMPTS, DEFAULT_PROMPT_WINDOW_MINUTES, DEFAULT_STATUS_CACHE_TTL_MINUTES,
    EngineConfig,
};
pub use error::{CoreError, RolloverError};
pub use ledger::{BucketRead, CounterBucket, CounterLedger, stage_reset};
pub use novedades::{NovedadConfigStore, NovedadRegistry, PrunePlan, UnitNovedades};
pub use orders::{OpenOrder, OrderTable};
pub use retry::with_optimistic_retry;
pub use rollover::{PurgeOutcome, RecoveryOutcome, RolloverEngine, RolloverOutcome, Trigger};
pub use scheduler::{MidnightScheduler, run_midnight_check};
pub use status::{RolloverStatus, StatusCache};
pub use units::UnitRegistry;

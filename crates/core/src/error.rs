// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use despacho_audit::StateSnapshot;
use despacho_domain::{DispatchDate, DomainError, OrderId, UnitId};
use despacho_store::StoreError;

/// Errors specific to the rollover family of operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverError {
    /// The day is already open; nothing to close. Non-fatal.
    NotNeeded {
        last_rollover_date: Option<DispatchDate>,
        today: DispatchDate,
    },
    /// Another rollover started from this client is still running.
    InProgress,
    /// The store applied only part of a rollover batch. Requires manual
    /// reconciliation from the logged snapshots.
    PartialBatchFailure {
        reason: String,
        before: StateSnapshot,
        after: StateSnapshot,
    },
    /// Concurrent writers kept invalidating the batch.
    Conflict { attempts: u32 },
}

impl std::fmt::Display for RolloverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotNeeded {
                last_rollover_date,
                today,
            } => match last_rollover_date {
                Some(last) => write!(
                    f,
                    "Rollover not needed: last rollover {last} is current for {today}"
                ),
                None => write!(f, "Rollover not needed for {today}"),
            },
            Self::InProgress => write!(f, "A rollover is already in progress"),
            Self::PartialBatchFailure {
                reason,
                before,
                after,
            } => write!(
                f,
                "Rollover batch partially applied ({reason}); before: [{}], after: [{}]",
                before.data, after.data
            ),
            Self::Conflict { attempts } => write!(
                f,
                "Rollover abandoned after {attempts} conflicting commit attempts"
            ),
        }
    }
}

impl std::error::Error for RolloverError {}

/// Errors that can occur in the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The document store failed.
    Store(StoreError),
    /// A rollover-family operation failed.
    Rollover(RolloverError),
    /// The order does not exist in the open order table.
    OrderNotFound(OrderId),
    /// The unit is not registered.
    UnitNotFound(UnitId),
    /// No snapshot exists for the date.
    ArchiveNotFound(DispatchDate),
    /// The novedad configuration document does not exist.
    ConfigMissing,
    /// An optimistic write kept losing to concurrent writers.
    WriteConflict { target: String, attempts: u32 },
}

impl CoreError {
    /// Returns true if the caller may retry later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::WriteConflict { .. } | Self::Rollover(RolloverError::Conflict { .. }) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Rollover(err) => write!(f, "{err}"),
            Self::OrderNotFound(id) => write!(f, "Order not found: {id}"),
            Self::UnitNotFound(id) => write!(f, "Unit not found: {id}"),
            Self::ArchiveNotFound(date) => write!(f, "No archive snapshot for {date}"),
            Self::ConfigMissing => write!(f, "Novedad configuration is missing"),
            Self::WriteConflict { target, attempts } => write!(
                f,
                "Write to {target} abandoned after {attempts} conflicting attempts"
            ),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<RolloverError> for CoreError {
    fn from(err: RolloverError) -> Self {
        Self::Rollover(err)
    }
}

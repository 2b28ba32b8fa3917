// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The daily rollover ("cierre").
//!
//! A rollover closes the dispatch day in one batch:
//!
//! 1. read the open orders
//! 2. write or merge the archive snapshot for the closing date
//! 3. delete every archived order
//! 4. reset today's counter bucket
//! 5. prune novedades that do not survive
//! 6. advance the rollover state to today
//!
//! The batch carries the revision of the rollover state and of every order
//! it read. If any of them changed before the commit, nothing is written
//! and the whole cycle runs again from a fresh read of the rollover state,
//! so two clients racing to close the same day archive its orders once.

use crate::archive::{ArchiveStore, StagedSnapshot};
use crate::audit_log::AuditLog;
use crate::clock::Clock;
use crate::collections::{ORDERS, ROLLOVER_STATE_KEY, SYSTEM};
use crate::config::EngineConfig;
use crate::error::{CoreError, RolloverError};
use crate::ledger::{stage_reset, store_serialization};
use crate::novedades::{NovedadConfigStore, NovedadRegistry, PrunePlan};
use crate::orders::{OpenOrder, OrderTable};
use crate::retry::with_optimistic_retry;
use crate::status::{RolloverStatus, StatusCache};
use chrono::{DateTime, Utc};
use despacho_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use despacho_domain::{
    DispatchDate, NovedadConfig, Order, RolloverState, is_within_prompt_window,
};
use despacho_store::{Batch, Document, DocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Who started an operation and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub actor: Actor,
    pub cause: Cause,
}

impl Trigger {
    #[must_use]
    pub const fn new(actor: Actor, cause: Cause) -> Self {
        Self { actor, cause }
    }

    /// The automatic midnight timer.
    #[must_use]
    pub fn scheduler(fired_at: DateTime<Utc>) -> Self {
        Self::new(
            Actor::scheduler(),
            Cause::new(
                format!("midnight-{}", fired_at.format("%Y%m%dT%H%M%SZ")),
                String::from("Automatic midnight rollover"),
            ),
        )
    }
}

/// Result of a completed rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverOutcome {
    /// Orders newly added to the snapshot. Ids already archived are removed
    /// from the live table without being counted.
    pub orders_archived: usize,
    pub units_updated: usize,
    pub new_rollover_date: DispatchDate,
    pub archive_date: DispatchDate,
}

/// Result of archiving stranded orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    /// Orders newly added to the snapshot.
    pub recovered: usize,
    pub archive_date: DispatchDate,
}

/// Result of an unconditional purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    /// Orders removed from the live table.
    pub purged: usize,
    pub archive_date: DispatchDate,
}

/// Orders taken off the live table and how many of them were new to the
/// snapshot. They differ when an id was already archived.
#[derive(Debug, Default, Clone, Copy)]
struct ArchivalCounts {
    removed: usize,
    added: usize,
}

/// What a failed commit would have touched, for partial-application checks
/// on stores without atomic batches.
struct BatchProbe {
    archive_date: DispatchDate,
    archive_revision: Option<u64>,
    order_keys: Vec<String>,
    /// Whether the batch also wrote the rollover state.
    writes_state: bool,
    state_revision: Option<u64>,
}

/// Closes dispatch days.
pub struct RolloverEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    orders: OrderTable,
    archive: ArchiveStore,
    novedades: NovedadRegistry,
    novedad_config: NovedadConfigStore,
    audit: AuditLog,
    cache: StatusCache,
}

impl RolloverEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            orders: OrderTable::new(store.clone(), clock.clone(), config),
            archive: ArchiveStore::new(store.clone(), config),
            novedades: NovedadRegistry::new(store.clone(), clock.clone(), config),
            novedad_config: NovedadConfigStore::new(store.clone()),
            audit: AuditLog::new(store.clone()),
            cache: StatusCache::new(),
            store,
            clock,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Returns the dispatch date of the current instant.
    #[must_use]
    pub fn today(&self) -> DispatchDate {
        self.config.today(self.clock.now())
    }

    fn read_state(&self) -> Result<(Option<Document>, RolloverState), CoreError> {
        let document: Option<Document> = self.store.get(SYSTEM, ROLLOVER_STATE_KEY)?;
        let state: RolloverState = match &document {
            Some(doc) => doc.decode()?,
            None => RolloverState::default(),
        };
        Ok((document, state))
    }

    /// Reports whether the day needs closing.
    ///
    /// Unless `force` is set, a result computed earlier for the same date is
    /// reused until it expires.
    ///
    /// # Errors
    ///
    /// Returns a store error if the rollover state cannot be read; the cache
    /// is left untouched.
    pub fn check_status(&self, force: bool) -> Result<RolloverStatus, CoreError> {
        let now: DateTime<Utc> = self.clock.now();
        let today: DispatchDate = self.config.today(now);

        let cached: Option<RolloverStatus> = if force {
            None
        } else {
            self.cache.get(today, now)
        };
        if let Some(status) = cached {
            debug!(%today, "Serving rollover status from cache");
            return Ok(status);
        }

        let (_, state) = self.read_state()?;
        let needs_rollover: bool = state.needs_rollover(today);
        let status: RolloverStatus = RolloverStatus {
            needs_rollover,
            last_rollover_date: state.last_rollover_date,
            today,
            prompt: needs_rollover && self.within_prompt_window(now),
            checked_at: now,
        };
        self.cache
            .store(status.clone(), now + self.config.status_cache_ttl);

        debug!(
            %today,
            needs_rollover,
            last_rollover_date = ?state.last_rollover_date,
            force,
            "Rollover status checked"
        );
        Ok(status)
    }

    fn within_prompt_window(&self, now: DateTime<Utc>) -> bool {
        is_within_prompt_window(now, self.config.timezone, self.config.prompt_window)
    }

    /// Drops any cached status.
    pub fn clear_status_cache(&self) {
        self.cache.invalidate();
        debug!("Rollover status cache cleared");
    }

    /// Checks status bypassing the cache and, if the day is stale, closes the
    /// last opened day. Used by both the manual button and the midnight
    /// timer.
    ///
    /// # Errors
    ///
    /// Returns `RolloverError::NotNeeded` if the day is already open, or any
    /// error from [`RolloverEngine::execute_rollover`].
    pub fn execute_due_rollover(&self, trigger: &Trigger) -> Result<RolloverOutcome, CoreError> {
        let status: RolloverStatus = self.check_status(true)?;
        if !status.needs_rollover {
            return Err(RolloverError::NotNeeded {
                last_rollover_date: status.last_rollover_date,
                today: status.today,
            }
            .into());
        }
        let state: RolloverState = RolloverState {
            last_rollover_date: status.last_rollover_date,
        };
        let target: DispatchDate = state.closing_date(status.today).unwrap_or(status.today);
        self.execute_rollover(target, trigger)
    }

    /// Closes the day, archiving open orders under `target_date`.
    ///
    /// # Errors
    ///
    /// - `RolloverError::NotNeeded` if the rollover state already records
    ///   today (nothing is written)
    /// - `RolloverError::Conflict` if concurrent writers invalidated every
    ///   attempt
    /// - `RolloverError::PartialBatchFailure` if a store without atomic
    ///   batches applied only part of the batch
    /// - a store error otherwise, with nothing written
    pub fn execute_rollover(
        &self,
        target_date: DispatchDate,
        trigger: &Trigger,
    ) -> Result<RolloverOutcome, CoreError> {
        self.run_rollover(target_date, false, trigger)
    }

    /// Closes the day even if it is not stale, archiving open orders under
    /// today's date.
    ///
    /// # Errors
    ///
    /// See [`RolloverEngine::execute_rollover`], except that `NotNeeded` is
    /// never returned.
    pub fn execute_forced_rollover(
        &self,
        trigger: &Trigger,
    ) -> Result<RolloverOutcome, CoreError> {
        let today: DispatchDate = self.today();
        warn!(%today, actor = %trigger.actor.id, "Forced rollover requested");
        self.run_rollover(today, true, trigger)
    }

    fn run_rollover(
        &self,
        target_date: DispatchDate,
        forced: bool,
        trigger: &Trigger,
    ) -> Result<RolloverOutcome, CoreError> {
        let result: Result<RolloverOutcome, CoreError> =
            self.retrying(|| self.rollover_cycle(target_date, forced, trigger));

        match &result {
            Ok(outcome) => {
                self.cache.invalidate();
                info!(
                    archive_date = %outcome.archive_date,
                    new_rollover_date = %outcome.new_rollover_date,
                    orders_archived = outcome.orders_archived,
                    units_updated = outcome.units_updated,
                    forced,
                    actor = %trigger.actor.id,
                    "Rollover completed"
                );
            }
            Err(CoreError::Rollover(RolloverError::NotNeeded { today, .. })) => {
                info!(%today, "Rollover not needed");
            }
            Err(err) => {
                error!(%target_date, forced, error = %err, "Rollover failed");
            }
        }
        result
    }

    fn retrying<T, F>(&self, cycle: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Result<T, CoreError>,
    {
        let attempts: u32 = self.config.max_commit_attempts;
        with_optimistic_retry("rollover", attempts, cycle).map_err(|err| match err {
            CoreError::WriteConflict { attempts, .. } => {
                RolloverError::Conflict { attempts }.into()
            }
            other => other,
        })
    }

    fn rollover_cycle(
        &self,
        target_date: DispatchDate,
        forced: bool,
        trigger: &Trigger,
    ) -> Result<RolloverOutcome, CoreError> {
        // The rollover state is always the first read of a cycle.
        let (state_doc, state) = self.read_state()?;
        let now: DateTime<Utc> = self.clock.now();
        let today: DispatchDate = self.config.today(now);

        if !forced && !state.needs_rollover(today) {
            return Err(RolloverError::NotNeeded {
                last_rollover_date: state.last_rollover_date,
                today,
            }
            .into());
        }
        // The state cannot advance past a later date, so closing normally
        // would only archive under today and reset today's counters.
        if !forced && state.is_ahead_of(today) {
            warn!(
                %today,
                last_rollover_date = %describe_date(state.last_rollover_date),
                "Recorded rollover date is ahead of today; check client clocks"
            );
            return Err(RolloverError::NotNeeded {
                last_rollover_date: state.last_rollover_date,
                today,
            }
            .into());
        }

        let open: Vec<OpenOrder> = self.orders.list_open_documents()?;
        let novedad_config: Option<NovedadConfig> = self.novedad_config.load_for_prune()?;
        let next_state: RolloverState = state.advanced_to(today);

        let mut batch: Batch = Batch::new();
        batch.require_unchanged(SYSTEM, ROLLOVER_STATE_KEY, state_doc.as_ref());
        let probe: BatchProbe = BatchProbe {
            archive_date: target_date,
            archive_revision: self.archive.revision(target_date)?,
            order_keys: open.iter().map(|o| o.document.key.clone()).collect(),
            writes_state: true,
            state_revision: state_doc.as_ref().map(|d| d.revision),
        };

        let staged: StagedSnapshot = self.stage_archival(&mut batch, target_date, &open, now)?;
        stage_reset(&mut batch, today)?;
        let prune: PrunePlan = self.novedades.stage_prune(&mut batch, novedad_config.as_ref())?;
        let state_body = serde_json::to_value(next_state).map_err(store_serialization)?;
        batch.set(SYSTEM, ROLLOVER_STATE_KEY, state_body, false);

        let action_name: &str = if forced {
            "ExecuteForcedRollover"
        } else {
            "ExecuteRollover"
        };
        let before: StateSnapshot = StateSnapshot::from_pairs(&[
            ("open_orders", open.len().to_string()),
            ("last_rollover_date", describe_date(state.last_rollover_date)),
        ]);
        let after: StateSnapshot = StateSnapshot::from_pairs(&[
            ("open_orders", String::from("0")),
            ("last_rollover_date", describe_date(next_state.last_rollover_date)),
            ("archive_date", target_date.to_string()),
            ("archived", staged.added.to_string()),
            ("novedades_pruned", prune.entries_dropped.to_string()),
        ]);
        let event: AuditEvent = AuditEvent::new(
            trigger.actor.clone(),
            trigger.cause.clone(),
            Action::new(
                action_name.to_string(),
                Some(format!("Closed {target_date}, opened {today}")),
            ),
            before.clone(),
            after.clone(),
            target_date,
            now,
        );
        self.audit.stage(&mut batch, &event)?;

        self.commit_checked(batch, &probe, &before, &after)?;

        Ok(RolloverOutcome {
            orders_archived: staged.added,
            units_updated: prune.units_updated,
            new_rollover_date: next_state.last_rollover_date.unwrap_or(today),
            archive_date: target_date,
        })
    }

    /// Stages the snapshot merge followed by the order deletions. The
    /// snapshot write comes first so a partially applied batch can never
    /// delete an order that was not archived.
    fn stage_archival(
        &self,
        batch: &mut Batch,
        archive_date: DispatchDate,
        open: &[OpenOrder],
        now: DateTime<Utc>,
    ) -> Result<StagedSnapshot, CoreError> {
        let orders: Vec<Order> = open.iter().map(|o| o.order.clone()).collect();
        let staged: StagedSnapshot = self.archive.stage_merge(batch, archive_date, orders, now)?;
        for open_order in open {
            let key: &str = &open_order.document.key;
            batch
                .require_unchanged(ORDERS, key, Some(&open_order.document))
                .delete(ORDERS, key);
        }
        Ok(staged)
    }

    fn commit_checked(
        &self,
        batch: Batch,
        probe: &BatchProbe,
        before: &StateSnapshot,
        after: &StateSnapshot,
    ) -> Result<(), CoreError> {
        let err: StoreError = match self.store.commit(batch) {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        if matches!(err, StoreError::PreconditionFailed { .. })
            || self.store.guarantees_atomic_commit()
        {
            return Err(err.into());
        }

        let partial: Result<bool, CoreError> = self.detect_partial(probe);
        let reason: String = match partial {
            Ok(false) => return Err(err.into()),
            Ok(true) => format!("commit failed after applying some writes: {err}"),
            Err(probe_err) => {
                format!("commit failed ({err}) and the outcome could not be verified: {probe_err}")
            }
        };
        error!(
            before = %before.data,
            after = %after.data,
            %reason,
            "Rollover batch partially applied; manual reconciliation required"
        );
        Err(RolloverError::PartialBatchFailure {
            reason,
            before: before.clone(),
            after: after.clone(),
        }
        .into())
    }

    fn detect_partial(&self, probe: &BatchProbe) -> Result<bool, CoreError> {
        if self.archive.revision(probe.archive_date)? != probe.archive_revision {
            return Ok(true);
        }
        let remaining: HashSet<String> = self
            .store
            .list(ORDERS)?
            .into_iter()
            .map(|d| d.key)
            .collect();
        if probe.order_keys.iter().any(|k| !remaining.contains(k)) {
            return Ok(true);
        }
        if probe.writes_state {
            let current: Option<u64> = self
                .store
                .get(SYSTEM, ROLLOVER_STATE_KEY)?
                .map(|d| d.revision);
            return Ok(current != probe.state_revision);
        }
        Ok(false)
    }

    /// Archives every open order under yesterday's date, regardless of
    /// whether the day is stale. Merges into an existing snapshot. A no-op
    /// when there are no open orders.
    ///
    /// # Errors
    ///
    /// Returns a store error, `RolloverError::Conflict` or
    /// `RolloverError::PartialBatchFailure` as for a rollover.
    pub fn recover_orphans(&self, trigger: &Trigger) -> Result<RecoveryOutcome, CoreError> {
        let archive_date: DispatchDate = self.today().previous()?;
        let recovered: usize = self
            .retrying(|| self.archive_cycle(archive_date, "RecoverOrphans", trigger))?
            .added;
        if recovered > 0 {
            info!(%archive_date, recovered, "Orphaned orders recovered");
        } else {
            debug!("No orphaned orders to recover");
        }
        Ok(RecoveryOutcome {
            recovered,
            archive_date,
        })
    }

    /// Archives every open order under today's date and clears the table,
    /// without touching counters, novedades or the rollover state.
    ///
    /// # Errors
    ///
    /// Returns a store error, `RolloverError::Conflict` or
    /// `RolloverError::PartialBatchFailure` as for a rollover.
    pub fn purge_all_orders(&self, trigger: &Trigger) -> Result<PurgeOutcome, CoreError> {
        let archive_date: DispatchDate = self.today();
        warn!(%archive_date, actor = %trigger.actor.id, "Purging all open orders");
        let purged: usize = self
            .retrying(|| self.archive_cycle(archive_date, "PurgeAllOrders", trigger))?
            .removed;
        warn!(%archive_date, purged, "All open orders purged");
        Ok(PurgeOutcome {
            purged,
            archive_date,
        })
    }

    fn archive_cycle(
        &self,
        archive_date: DispatchDate,
        action_name: &str,
        trigger: &Trigger,
    ) -> Result<ArchivalCounts, CoreError> {
        let open: Vec<OpenOrder> = self.orders.list_open_documents()?;
        if open.is_empty() {
            return Ok(ArchivalCounts::default());
        }
        let now: DateTime<Utc> = self.clock.now();

        let mut batch: Batch = Batch::new();
        let probe: BatchProbe = BatchProbe {
            archive_date,
            archive_revision: self.archive.revision(archive_date)?,
            order_keys: open.iter().map(|o| o.document.key.clone()).collect(),
            writes_state: false,
            state_revision: None,
        };
        let staged: StagedSnapshot = self.stage_archival(&mut batch, archive_date, &open, now)?;

        let before: StateSnapshot =
            StateSnapshot::from_pairs(&[("open_orders", open.len().to_string())]);
        let after: StateSnapshot = StateSnapshot::from_pairs(&[
            ("open_orders", String::from("0")),
            ("archive_date", archive_date.to_string()),
            ("archived", staged.added.to_string()),
        ]);
        let event: AuditEvent = AuditEvent::new(
            trigger.actor.clone(),
            trigger.cause.clone(),
            Action::new(
                action_name.to_string(),
                Some(format!("{} orders into {archive_date}", open.len())),
            ),
            before.clone(),
            after.clone(),
            archive_date,
            now,
        );
        self.audit.stage(&mut batch, &event)?;

        self.commit_checked(batch, &probe, &before, &after)?;
        Ok(ArchivalCounts {
            removed: open.len(),
            added: staged.added,
        })
    }

    /// Returns the audit trail, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_audit_events(&self) -> Result<Vec<AuditEvent>, CoreError> {
        self.audit.list()
    }
}

fn describe_date(date: Option<DispatchDate>) -> String {
    date.map_or_else(|| String::from("never"), |d| d.to_string())
}

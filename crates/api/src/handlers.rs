// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The UI-facing dispatch API.
//!
//! Every operation enforces authorization first, then translates the request
//! into core calls, and finally maps core results into response DTOs.

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::error::ApiError;
use crate::request_response::{
    AddNovedadRequest, ArchiveResponse, AssignOrderRequest, AuditTrailResponse,
    CounterResponse, CountersResponse, CreateOrderRequest, ListArchivedDatesResponse,
    ListOrdersResponse, ListUnitsResponse, NovedadChangeResponse, NovedadConfigRequest,
    NovedadConfigResponse, NovedadesResponse, OrderResponse, PurgeOrdersResponse,
    RecoverOrphansResponse, RolloverResponse, StatusResponse, UpsertUnitRequest,
};
use despacho::{
    ArchiveStore, Clock, CounterLedger, EngineConfig, NovedadConfigStore, NovedadRegistry,
    OrderTable, PurgeOutcome, RecoveryOutcome, RolloverEngine, RolloverOutcome, RolloverStatus,
    Trigger, UnitRegistry,
};
use despacho_audit::Cause;
use despacho_domain::{
    ArchiveSnapshot, DispatchDate, DomainError, NewOrder, NovedadConfig, NovedadConfigEntry,
    Order, OrderId, Unit, UnitId, validate_unit_id,
};
use despacho_store::DocumentStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Held while a rollover-family operation runs from this client.
///
/// Released on drop, so the flag is cleared on every exit path.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ApiError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ApiError::RolloverInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The dispatch API served to operator consoles.
pub struct DispatchApi {
    engine: Arc<RolloverEngine>,
    orders: OrderTable,
    ledger: CounterLedger,
    novedades: NovedadRegistry,
    novedad_config: NovedadConfigStore,
    archive: ArchiveStore,
    units: UnitRegistry,
    pub(crate) busy: AtomicBool,
}

impl DispatchApi {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            engine: Arc::new(RolloverEngine::new(store.clone(), clock.clone(), config)),
            orders: OrderTable::new(store.clone(), clock.clone(), config),
            ledger: CounterLedger::new(store.clone(), clock.clone(), config),
            novedades: NovedadRegistry::new(store.clone(), clock, config),
            novedad_config: NovedadConfigStore::new(store.clone()),
            archive: ArchiveStore::new(store.clone(), config),
            units: UnitRegistry::new(store),
            busy: AtomicBool::new(false),
        }
    }

    /// The engine shared with the midnight scheduler.
    #[must_use]
    pub fn engine(&self) -> Arc<RolloverEngine> {
        self.engine.clone()
    }

    /// Returns true while a rollover-family operation from this client is
    /// running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Rollover
    // ------------------------------------------------------------------

    /// Reports whether the day needs closing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the store cannot be read.
    pub fn get_status(&self, force: bool) -> Result<StatusResponse, ApiError> {
        let status: RolloverStatus = self.engine.check_status(force)?;
        Ok(StatusResponse {
            needs_rollover: status.needs_rollover,
            prompt: status.prompt,
            today: status.today,
            last_rollover_date: status.last_rollover_date,
            checked_at: status.checked_at,
        })
    }

    /// Drops the cached status so the next check reads the store.
    pub fn clear_status_cache(&self) {
        self.engine.clear_status_cache();
    }

    /// The operator's "cierre" button: closes the day if it is stale.
    ///
    /// # Errors
    ///
    /// - `ApiError::RolloverInProgress` if this client is already running one
    /// - `ApiError::RolloverNotNeeded` if the day is already open
    /// - any store or conflict error from the rollover
    pub fn trigger_manual_rollover(
        &self,
        actor: &AuthenticatedActor,
        cause: Cause,
    ) -> Result<RolloverResponse, ApiError> {
        let _busy: BusyGuard<'_> = BusyGuard::acquire(&self.busy)?;
        let trigger: Trigger = Trigger::new(actor.to_audit_actor(), cause);
        let outcome: RolloverOutcome = self.engine.execute_due_rollover(&trigger)?;
        Ok(rollover_response(&outcome))
    }

    /// Closes the day even if it is already open. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for operators, otherwise as for
    /// [`DispatchApi::trigger_manual_rollover`] minus `RolloverNotNeeded`.
    pub fn trigger_forced_rollover(
        &self,
        actor: &AuthenticatedActor,
        cause: Cause,
    ) -> Result<RolloverResponse, ApiError> {
        AuthorizationService::authorize_forced_rollover(actor)?;
        let _busy: BusyGuard<'_> = BusyGuard::acquire(&self.busy)?;
        let trigger: Trigger = Trigger::new(actor.to_audit_actor(), cause);
        let outcome: RolloverOutcome = self.engine.execute_forced_rollover(&trigger)?;
        Ok(rollover_response(&outcome))
    }

    /// Archives orders stranded by an incomplete earlier rollover under
    /// yesterday's date. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for operators,
    /// `ApiError::RolloverInProgress`, or a store error.
    pub fn recover_orphans(
        &self,
        actor: &AuthenticatedActor,
        cause: Cause,
    ) -> Result<RecoverOrphansResponse, ApiError> {
        AuthorizationService::authorize_recover_orphans(actor)?;
        let _busy: BusyGuard<'_> = BusyGuard::acquire(&self.busy)?;
        let trigger: Trigger = Trigger::new(actor.to_audit_actor(), cause);
        let outcome: RecoveryOutcome = self.engine.recover_orphans(&trigger)?;
        Ok(RecoverOrphansResponse {
            recovered: outcome.recovered,
            archive_date: outcome.archive_date,
            message: format!(
                "Recovered {} orders into {}",
                outcome.recovered, outcome.archive_date
            ),
        })
    }

    /// Archives and clears every open order. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for operators,
    /// `ApiError::RolloverInProgress`, or a store error.
    pub fn purge_all_orders(
        &self,
        actor: &AuthenticatedActor,
        cause: Cause,
    ) -> Result<PurgeOrdersResponse, ApiError> {
        AuthorizationService::authorize_purge_all_orders(actor)?;
        let _busy: BusyGuard<'_> = BusyGuard::acquire(&self.busy)?;
        let trigger: Trigger = Trigger::new(actor.to_audit_actor(), cause);
        let outcome: PurgeOutcome = self.engine.purge_all_orders(&trigger)?;
        Ok(PurgeOrdersResponse {
            purged: outcome.purged,
            archive_date: outcome.archive_date,
            message: format!(
                "Purged {} orders into {}",
                outcome.purged, outcome.archive_date
            ),
        })
    }

    // ------------------------------------------------------------------
    // Archive
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_archived_dates(&self) -> Result<ListArchivedDatesResponse, ApiError> {
        Ok(ListArchivedDatesResponse {
            dates: self.archive.list_dates()?,
        })
    }

    /// Returns the snapshot for a date given as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a malformed date and
    /// `ApiError::ResourceNotFound` if nothing was archived that day.
    pub fn get_archive(&self, date: &str) -> Result<ArchiveResponse, ApiError> {
        let date: DispatchDate = date.parse::<DispatchDate>()?;
        let snapshot: ArchiveSnapshot = self.archive.read_snapshot(date)?;
        Ok(ArchiveResponse {
            date: snapshot.date,
            order_count: snapshot.order_count,
            unassigned_count: snapshot.unassigned_count(),
            archived_at: snapshot.archived_at,
            orders: snapshot.orders,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_audit_events(&self) -> Result<AuditTrailResponse, ApiError> {
        Ok(AuditTrailResponse {
            events: self.engine.list_audit_events()?,
        })
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_open_orders(&self) -> Result<ListOrdersResponse, ApiError> {
        Ok(ListOrdersResponse {
            orders: self.orders.list_open()?,
        })
    }

    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if the address is empty, or a store
    /// error.
    pub fn create_order(&self, request: CreateOrderRequest) -> Result<OrderResponse, ApiError> {
        let order: Order = self.orders.create(NewOrder {
            client_ref: request.client_ref,
            address: request.address,
            notes: request.notes,
            is_parcel: request.is_parcel,
        })?;
        Ok(OrderResponse { order })
    }

    /// Assigns an order to a unit.
    ///
    /// A unit that is disabled or carries an active novedad cannot take
    /// trips.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ResourceNotFound` for an unknown order or unit and
    /// `ApiError::DomainRuleViolation` if the unit cannot take trips.
    pub fn assign_order(
        &self,
        order_id: &str,
        request: &AssignOrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        let order_id: OrderId = parse_order_id(order_id)?;
        let unit_id: UnitId = parse_unit_id(&request.unit)?;

        let unit: Unit = self.units.get(&unit_id)?;
        if !unit.is_available() {
            return Err(ApiError::DomainRuleViolation {
                rule: String::from("unit_available"),
                message: format!("Unit {} is disabled", unit.number),
            });
        }
        let active: usize = self.novedades.count_active(&unit_id)?;
        if active > 0 {
            return Err(ApiError::DomainRuleViolation {
                rule: String::from("unit_without_novedades"),
                message: format!("Unit {} has {active} active novedades", unit.number),
            });
        }

        let order: Order = self.orders.assign(&order_id, &unit_id)?;
        Ok(OrderResponse { order })
    }

    /// # Errors
    ///
    /// Returns `ApiError::ResourceNotFound` if the order is not open.
    pub fn confirm_order(&self, order_id: &str) -> Result<OrderResponse, ApiError> {
        let order_id: OrderId = parse_order_id(order_id)?;
        let order: Order = self.orders.confirm(&order_id)?;
        Ok(OrderResponse { order })
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_counters(&self) -> Result<CountersResponse, ApiError> {
        Ok(CountersResponse {
            date: self.engine.today(),
            counts: self.ledger.counts_today()?,
        })
    }

    /// Manually adds a trip to a unit's count for today.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a malformed unit id, or a store
    /// or conflict error.
    pub fn increment_counter(&self, unit: &str) -> Result<CounterResponse, ApiError> {
        let unit: UnitId = parse_unit_id(unit)?;
        let count: u32 = self.ledger.increment(&unit)?;
        Ok(CounterResponse {
            unit,
            date: self.engine.today(),
            count,
        })
    }

    /// Manually removes a trip from a unit's count for today. Never goes
    /// below zero.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a malformed unit id, or a store
    /// or conflict error.
    pub fn decrement_counter(&self, unit: &str) -> Result<CounterResponse, ApiError> {
        let unit: UnitId = parse_unit_id(unit)?;
        let count: u32 = self.ledger.decrement(&unit)?;
        Ok(CounterResponse {
            unit,
            date: self.engine.today(),
            count,
        })
    }

    // ------------------------------------------------------------------
    // Novedades
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_novedades(&self, unit: &str) -> Result<NovedadesResponse, ApiError> {
        let unit: UnitId = parse_unit_id(unit)?;
        let novedades = self.novedades.list_active(&unit)?;
        Ok(NovedadesResponse { unit, novedades })
    }

    /// Flags a unit. Only codes enabled in the configuration are accepted.
    /// Adding a code that is already active changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ResourceNotFound` if the unit or the configuration
    /// is missing and `ApiError::DomainRuleViolation` for a code that is not
    /// enabled.
    pub fn add_novedad(
        &self,
        unit: &str,
        request: &AddNovedadRequest,
    ) -> Result<NovedadChangeResponse, ApiError> {
        let unit: UnitId = parse_unit_id(unit)?;
        self.units.get(&unit)?;
        let config: NovedadConfig = self.novedad_config.require()?;
        let Some(entry) = config.entry(&request.code).filter(|e| e.enabled) else {
            return Err(DomainError::NovedadCodeNotConfigured(request.code.clone()).into());
        };
        let description: &str = request.description.as_deref().unwrap_or(&entry.description);
        let changed: bool = self.novedades.add(&unit, &request.code, description)?;
        Ok(NovedadChangeResponse {
            unit,
            code: request.code.clone(),
            changed,
        })
    }

    /// Clears a flag. Removing an absent code changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn remove_novedad(&self, unit: &str, code: &str) -> Result<NovedadChangeResponse, ApiError> {
        let unit: UnitId = parse_unit_id(unit)?;
        let changed: bool = self.novedades.remove(&unit, code)?;
        Ok(NovedadChangeResponse {
            unit,
            code: code.to_string(),
            changed,
        })
    }

    /// # Errors
    ///
    /// Returns `ApiError::ResourceNotFound` if no configuration was saved.
    pub fn get_novedad_config(&self) -> Result<NovedadConfigResponse, ApiError> {
        Ok(NovedadConfigResponse {
            entries: self.novedad_config.require()?.entries,
        })
    }

    /// Replaces the novedad configuration. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for operators and
    /// `ApiError::InvalidInput` or `ApiError::DomainRuleViolation` for
    /// malformed or duplicate codes.
    pub fn save_novedad_config(
        &self,
        actor: &AuthenticatedActor,
        request: NovedadConfigRequest,
    ) -> Result<NovedadConfigResponse, ApiError> {
        AuthorizationService::authorize_save_novedad_config(actor)?;
        let entries: Vec<NovedadConfigEntry> = request.entries;
        let config: NovedadConfig = NovedadConfig::new(entries)?;
        self.novedad_config.save(&config)?;
        info!(actor = %actor.id, codes = config.entries.len(), "Novedad configuration saved");
        Ok(NovedadConfigResponse {
            entries: config.entries,
        })
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_units(&self) -> Result<ListUnitsResponse, ApiError> {
        Ok(ListUnitsResponse {
            units: self.units.list()?,
        })
    }

    /// Registers or edits a unit. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for operators and
    /// `ApiError::InvalidInput` for a malformed id or number.
    pub fn upsert_unit(
        &self,
        actor: &AuthenticatedActor,
        request: &UpsertUnitRequest,
    ) -> Result<Unit, ApiError> {
        AuthorizationService::authorize_upsert_unit(actor)?;
        let unit: Unit = Unit {
            id: parse_unit_id(&request.id)?,
            number: request.number,
            enabled: request.enabled,
            disabled_checkbox: request.disabled_checkbox,
        };
        self.units.upsert(&unit)?;
        if !unit.is_available() {
            warn!(unit = %unit.id, "Unit saved as unavailable");
        }
        Ok(unit)
    }
}

fn rollover_response(outcome: &RolloverOutcome) -> RolloverResponse {
    RolloverResponse {
        orders_archived: outcome.orders_archived,
        units_updated: outcome.units_updated,
        archive_date: outcome.archive_date,
        new_rollover_date: outcome.new_rollover_date,
        message: format!(
            "Closed {} with {} orders; day {} is open",
            outcome.archive_date, outcome.orders_archived, outcome.new_rollover_date
        ),
    }
}

fn parse_unit_id(raw: &str) -> Result<UnitId, ApiError> {
    let unit: UnitId = UnitId::new(raw);
    validate_unit_id(&unit)?;
    Ok(unit)
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    let trimmed: &str = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidOrderId(String::from("Order id cannot be empty")).into());
    }
    Ok(OrderId::new(trimmed))
}

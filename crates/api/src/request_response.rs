// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use chrono::{DateTime, Utc};
use despacho_audit::AuditEvent;
use despacho_domain::{
    ArchiveDateSummary, DispatchDate, Novedad, NovedadConfigEntry, Order, Unit, UnitId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether the day needs closing, and whether to prompt for it now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub needs_rollover: bool,
    /// Presentation hint only; `needs_rollover` is authoritative.
    pub prompt: bool,
    pub today: DispatchDate,
    pub last_rollover_date: Option<DispatchDate>,
    pub checked_at: DateTime<Utc>,
}

/// API response for a completed rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverResponse {
    pub orders_archived: usize,
    pub units_updated: usize,
    pub archive_date: DispatchDate,
    pub new_rollover_date: DispatchDate,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverOrphansResponse {
    pub recovered: usize,
    pub archive_date: DispatchDate,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOrdersResponse {
    pub purged: usize,
    pub archive_date: DispatchDate,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListArchivedDatesResponse {
    /// Archived dates, newest first.
    pub dates: Vec<ArchiveDateSummary>,
}

/// One archived day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveResponse {
    pub date: DispatchDate,
    pub order_count: usize,
    pub unassigned_count: usize,
    pub archived_at: DateTime<Utc>,
    pub orders: Vec<Order>,
}

/// API request to take a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub client_ref: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_parcel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignOrderRequest {
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
}

/// Trip counts per unit for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersResponse {
    pub date: DispatchDate,
    pub counts: BTreeMap<UnitId, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResponse {
    pub unit: UnitId,
    pub date: DispatchDate,
    pub count: u32,
}

/// API request to flag a unit. The description defaults to the one
/// configured for the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNovedadRequest {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovedadesResponse {
    pub unit: UnitId,
    pub novedades: Vec<Novedad>,
}

/// Result of an idempotent novedad add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovedadChangeResponse {
    pub unit: UnitId,
    pub code: String,
    /// False when the request matched the existing state.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovedadConfigRequest {
    pub entries: Vec<NovedadConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovedadConfigResponse {
    pub entries: Vec<NovedadConfigEntry>,
}

/// API request to register or edit a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertUnitRequest {
    pub id: String,
    pub number: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub disabled_checkbox: bool,
}

const fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUnitsResponse {
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailResponse {
    /// Newest first.
    pub events: Vec<AuditEvent>,
}

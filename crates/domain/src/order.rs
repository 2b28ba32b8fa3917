// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Dispatch orders and archived-order normalization.
//!
//! Orders are created by intake (phone, bot, manual entry), mutated by
//! assignment and confirmation, and removed from the open table only by the
//! rollover, which moves them into a dated archive snapshot.
//!
//! Archived orders written by older releases did not share one schema.
//! [`normalize_archived_order`] maps those records onto the canonical
//! [`Order`] and is the only place legacy field names are understood.

use crate::error::DomainError;
use crate::types::{OrderId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single reassignment in an order's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentEntry {
    /// The unit the order was assigned to at this point.
    pub unit: UnitId,
    /// When the assignment happened.
    pub time: DateTime<Utc>,
}

/// A dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Caller reference (phone number, chat handle, or free text).
    pub client_ref: String,
    /// When the order was received.
    pub requested_at: DateTime<Utc>,
    /// Pickup address.
    pub address: String,
    /// Operator notes.
    #[serde(default)]
    pub notes: String,
    /// The unit currently assigned, if any.
    #[serde(default)]
    pub assigned_unit: Option<UnitId>,
    /// When the current unit was assigned.
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Whether the client confirmed the pickup.
    #[serde(default)]
    pub confirmed: bool,
    /// When the order was confirmed.
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Every assignment in order, oldest first.
    #[serde(default)]
    pub reassignment_history: Vec<ReassignmentEntry>,
    /// Parcel delivery instead of a passenger ride.
    #[serde(default)]
    pub is_parcel: bool,
}

impl Order {
    /// Builds a fresh, unassigned order from intake data.
    #[must_use]
    pub fn from_intake(id: OrderId, intake: NewOrder, requested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            client_ref: intake.client_ref,
            requested_at,
            address: intake.address,
            notes: intake.notes,
            assigned_unit: None,
            assigned_at: None,
            confirmed: false,
            confirmed_at: None,
            reassignment_history: Vec::new(),
            is_parcel: intake.is_parcel,
        }
    }

    /// Returns true if the order has never been assigned.
    ///
    /// Such orders are archived as "unassigned".
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.assigned_unit.is_none()
    }

    /// Assigns the order to a unit, returning the previously assigned unit.
    ///
    /// Every assignment, including the first, is appended to the history.
    pub fn assign(&mut self, unit: UnitId, at: DateTime<Utc>) -> Option<UnitId> {
        self.reassignment_history.push(ReassignmentEntry {
            unit: unit.clone(),
            time: at,
        });
        self.assigned_at = Some(at);
        self.assigned_unit.replace(unit)
    }

    /// Marks the order as confirmed. Confirming twice keeps the first timestamp.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        if !self.confirmed {
            self.confirmed = true;
            self.confirmed_at = Some(at);
        }
    }
}

/// Intake data for a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Caller reference.
    pub client_ref: String,
    /// Pickup address.
    pub address: String,
    /// Operator notes.
    #[serde(default)]
    pub notes: String,
    /// Parcel delivery.
    #[serde(default)]
    pub is_parcel: bool,
}

const ADDRESS_ALIASES: [&str; 4] = ["address", "direccion", "destino", "origen"];
const UNIT_ALIASES: [&str; 3] = ["assigned_unit", "unidad", "taxi"];
const NOTES_ALIASES: [&str; 2] = ["notes", "observaciones"];
const CLIENT_ALIASES: [&str; 3] = ["client_ref", "cliente", "telefono"];
const PARCEL_ALIASES: [&str; 2] = ["is_parcel", "encomienda"];
const REQUESTED_AT_ALIASES: [&str; 3] = ["requested_at", "fecha", "hora"];

/// Maps an archived order record onto the canonical [`Order`] schema.
///
/// Canonical records deserialize directly. Legacy records are rebuilt field
/// by field using the known aliases; missing optional fields take defaults.
/// `fallback_time` is used when no request timestamp can be recovered
/// (typically the snapshot's `archived_at`).
///
/// # Errors
///
/// Returns `DomainError::UnreadableArchivedOrder` if the record is not an
/// object or has no usable id.
pub fn normalize_archived_order(
    record: &Value,
    fallback_time: DateTime<Utc>,
) -> Result<Order, DomainError> {
    if let Ok(order) = serde_json::from_value::<Order>(record.clone()) {
        return Ok(order);
    }

    let fields: &Map<String, Value> =
        record
            .as_object()
            .ok_or_else(|| DomainError::UnreadableArchivedOrder {
                reason: format!("expected an object, found {record}"),
            })?;

    let id: String = first_text(fields, &["id"]).ok_or_else(|| {
        DomainError::UnreadableArchivedOrder {
            reason: String::from("record has no id"),
        }
    })?;

    let requested_at: DateTime<Utc> = first_text(fields, &REQUESTED_AT_ALIASES)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map_or(fallback_time, |dt| dt.with_timezone(&Utc));

    let assigned_unit: Option<UnitId> = first_text(fields, &UNIT_ALIASES)
        .map(|raw| UnitId::new(&raw))
        .filter(|unit| !unit.as_str().is_empty());

    let reassignment_history: Vec<ReassignmentEntry> = fields
        .get("reassignment_history")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
        .unwrap_or_default();

    Ok(Order {
        id: OrderId::new(&id),
        client_ref: first_text(fields, &CLIENT_ALIASES).unwrap_or_default(),
        requested_at,
        address: first_text(fields, &ADDRESS_ALIASES).unwrap_or_default(),
        notes: first_text(fields, &NOTES_ALIASES).unwrap_or_default(),
        assigned_at: assigned_unit.as_ref().map(|_| requested_at),
        assigned_unit,
        confirmed: first_bool(fields, &["confirmed", "confirmado"]),
        confirmed_at: None,
        reassignment_history,
        is_parcel: first_bool(fields, &PARCEL_ALIASES),
    })
}

/// Returns the first non-empty textual value among `keys`.
///
/// Numbers are accepted and rendered as text (legacy unit numbers).
fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn first_bool(fields: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_bool))
        .unwrap_or(false)
}

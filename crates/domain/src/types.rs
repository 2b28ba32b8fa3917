// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Represents a taxi unit identifier.
///
/// Unit ids are stable strings (usually the painted unit number) and are the
/// key used by the counter ledger and the novedad registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Creates a new `UnitId`.
    ///
    /// Surrounding whitespace is trimmed. Validation happens separately via
    /// [`crate::validate_unit_id`] so that legacy records can still be read.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UnitId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: Self = Self::new(s);
        crate::validation::validate_unit_id(&id)?;
        Ok(id)
    }
}

/// Represents an order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new `OrderId`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A taxi unit in the fleet.
///
/// Units are never mutated by the rollover; they are included because the
/// ledger and registry are keyed by unit id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier.
    pub id: UnitId,
    /// The number displayed on the taxi grid.
    pub number: u32,
    /// Whether the unit is part of the active fleet.
    pub enabled: bool,
    /// Operator-set "temporarily out" checkbox.
    #[serde(default)]
    pub disabled_checkbox: bool,
}

impl Unit {
    /// Creates an enabled unit.
    #[must_use]
    pub const fn new(id: UnitId, number: u32) -> Self {
        Self {
            id,
            number,
            enabled: true,
            disabled_checkbox: false,
        }
    }

    /// Returns true if the unit may receive new assignments, ignoring novedades.
    ///
    /// Active novedades are checked by the caller through the registry.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.enabled && !self.disabled_checkbox
    }
}

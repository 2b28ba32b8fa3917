// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::collections::UNITS;
use crate::error::CoreError;
use crate::ledger::store_serialization;
use despacho_domain::{Unit, UnitId, validate_unit};
use despacho_store::DocumentStore;
use std::sync::Arc;
use tracing::info;

/// Registered taxi units. Rollover never touches this collection.
#[derive(Clone)]
pub struct UnitRegistry {
    store: Arc<dyn DocumentStore>,
}

impl UnitRegistry {
    #[must_use]
    pub const fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates or replaces a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is invalid or the store write fails.
    pub fn upsert(&self, unit: &Unit) -> Result<(), CoreError> {
        validate_unit(unit)?;
        let body = serde_json::to_value(unit).map_err(store_serialization)?;
        self.store.set(UNITS, unit.id.as_str(), body, false)?;
        info!(unit = %unit.id, number = unit.number, enabled = unit.enabled, "Unit saved");
        Ok(())
    }

    /// Looks up a unit.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnitNotFound` if the unit is not registered.
    pub fn get(&self, id: &UnitId) -> Result<Unit, CoreError> {
        self.store
            .get(UNITS, id.as_str())?
            .ok_or_else(|| CoreError::UnitNotFound(id.clone()))?
            .decode()
            .map_err(CoreError::from)
    }

    /// Lists units ordered by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list(&self) -> Result<Vec<Unit>, CoreError> {
        let mut units: Vec<Unit> = self
            .store
            .list(UNITS)?
            .iter()
            .map(|doc| doc.decode().map_err(CoreError::from))
            .collect::<Result<Vec<Unit>, CoreError>>()?;
        units.sort_by_key(|u| u.number);
        Ok(units)
    }
}

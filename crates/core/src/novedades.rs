// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Novedad registry and configuration.
//!
//! Each unit has one document holding its novedad entries. Add and remove
//! are idempotent so that repeated UI actions never stack duplicate flags.

use crate::clock::Clock;
use crate::collections::{CONFIG, NOVEDAD_CONFIG_KEY, NOVEDADES, UNITS};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::ledger::store_serialization;
use crate::retry::with_optimistic_retry;
use despacho_domain::{Novedad, NovedadConfig, UnitId, retain_surviving, validate_novedad_code};
use despacho_store::{Batch, Document, DocumentStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The novedad document of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNovedades {
    pub unit: UnitId,
    #[serde(default)]
    pub entries: Vec<Novedad>,
}

impl UnitNovedades {
    #[must_use]
    pub const fn empty(unit: UnitId) -> Self {
        Self {
            unit,
            entries: Vec::new(),
        }
    }

    /// Returns the entries currently in effect.
    pub fn active(&self) -> impl Iterator<Item = &Novedad> {
        self.entries.iter().filter(|n| n.active)
    }
}

/// Outcome of staging a prune.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePlan {
    /// Units whose entries changed.
    pub units_updated: usize,
    /// Entries removed across all units.
    pub entries_dropped: usize,
}

/// Per-unit novedad flags.
#[derive(Clone)]
pub struct NovedadRegistry {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl NovedadRegistry {
    #[must_use]
    pub const fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn read(&self, unit: &UnitId) -> Result<(Option<Document>, UnitNovedades), CoreError> {
        let document: Option<Document> = self.store.get(NOVEDADES, unit.as_str())?;
        let novedades: UnitNovedades = match &document {
            Some(doc) => doc.decode()?,
            None => UnitNovedades::empty(unit.clone()),
        };
        Ok((document, novedades))
    }

    /// Read-modify-write of one unit's document. `change` returns false to
    /// skip the write.
    fn modify<F>(&self, unit: &UnitId, mut change: F) -> Result<bool, CoreError>
    where
        F: FnMut(&mut UnitNovedades) -> bool,
    {
        let what: String = format!("{NOVEDADES}/{unit}");
        with_optimistic_retry(&what, self.config.max_commit_attempts, || {
            let (document, mut novedades) = self.read(unit)?;
            if !change(&mut novedades) {
                return Ok(false);
            }
            let body = serde_json::to_value(&novedades).map_err(store_serialization)?;
            let mut batch: Batch = Batch::new();
            batch
                .require_unchanged(NOVEDADES, unit.as_str(), document.as_ref())
                .set(NOVEDADES, unit.as_str(), body, false);
            self.store.commit(batch)?;
            Ok(true)
        })
    }

    /// Sets a novedad on a unit. Adding a code that is already active is a
    /// no-op; returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed or the store write fails.
    pub fn add(&self, unit: &UnitId, code: &str, description: &str) -> Result<bool, CoreError> {
        validate_novedad_code(code)?;
        let now = self.clock.now();
        let changed: bool = self.modify(unit, |novedades| {
            if novedades.active().any(|n| n.code == code) {
                return false;
            }
            // An inactive entry with the same code is replaced.
            novedades.entries.retain(|n| n.code != code);
            novedades.entries.push(Novedad {
                code: code.to_string(),
                description: description.to_string(),
                active: true,
                set_at: now,
            });
            true
        })?;
        if changed {
            info!(%unit, code, "Novedad added");
        }
        Ok(changed)
    }

    /// Clears a novedad from a unit. Removing an absent code is a no-op;
    /// returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn remove(&self, unit: &UnitId, code: &str) -> Result<bool, CoreError> {
        let changed: bool = self.modify(unit, |novedades| {
            let before: usize = novedades.entries.len();
            novedades.entries.retain(|n| n.code != code);
            novedades.entries.len() != before
        })?;
        if changed {
            info!(%unit, code, "Novedad removed");
        }
        Ok(changed)
    }

    /// Returns the active novedades of a unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_active(&self, unit: &UnitId) -> Result<Vec<Novedad>, CoreError> {
        let (_, novedades) = self.read(unit)?;
        Ok(novedades.active().cloned().collect())
    }

    /// Returns how many novedades are active on a unit.
    ///
    /// A non-zero count means the unit must not receive assignments.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn count_active(&self, unit: &UnitId) -> Result<usize, CoreError> {
        let (_, novedades) = self.read(unit)?;
        Ok(novedades.active().count())
    }

    /// Returns every unit's novedad document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_all(&self) -> Result<Vec<UnitNovedades>, CoreError> {
        self.store
            .list(NOVEDADES)?
            .iter()
            .map(|doc| doc.decode().map_err(CoreError::from))
            .collect()
    }

    /// Removes every entry whose code does not survive the rollover.
    ///
    /// With no configuration nothing survives.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or concurrent writers exhaust
    /// the retry budget.
    pub fn prune_non_surviving(
        &self,
        config: Option<&NovedadConfig>,
    ) -> Result<PrunePlan, CoreError> {
        with_optimistic_retry(NOVEDADES, self.config.max_commit_attempts, || {
            let mut batch: Batch = Batch::new();
            let plan: PrunePlan = self.stage_prune(&mut batch, config)?;
            if !batch.is_empty() {
                self.store.commit(batch)?;
            }
            Ok(plan)
        })
    }

    /// Adds the prune writes to `batch`.
    ///
    /// Every novedad document read is guarded, including those left as
    /// they are, and so is the absence of a document for each registered
    /// unit without one. A flag set on any registered unit after the read
    /// fails the commit instead of surviving the prune.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stage_prune(
        &self,
        batch: &mut Batch,
        config: Option<&NovedadConfig>,
    ) -> Result<PrunePlan, CoreError> {
        let mut plan: PrunePlan = PrunePlan::default();
        let mut seen: HashSet<String> = HashSet::new();
        for document in self.store.list(NOVEDADES)? {
            seen.insert(document.key.clone());
            batch.require_unchanged(NOVEDADES, &document.key, Some(&document));
            let mut novedades: UnitNovedades = document.decode()?;
            let (kept, dropped) =
                retain_surviving(std::mem::take(&mut novedades.entries), config);
            if dropped.is_empty() {
                continue;
            }
            debug!(unit = %novedades.unit, dropped = dropped.len(), "Pruning novedades");
            plan.units_updated += 1;
            plan.entries_dropped += dropped.len();
            novedades.entries = kept;
            let body = serde_json::to_value(&novedades).map_err(store_serialization)?;
            batch.set(NOVEDADES, &document.key, body, false);
        }
        for unit in self.store.list(UNITS)? {
            if !seen.contains(&unit.key) {
                batch.require_revision(NOVEDADES, &unit.key, None);
            }
        }
        Ok(plan)
    }
}

/// Storage of the global novedad configuration.
#[derive(Clone)]
pub struct NovedadConfigStore {
    store: Arc<dyn DocumentStore>,
}

impl NovedadConfigStore {
    #[must_use]
    pub const fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Loads the configuration, or `None` if it has never been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the document is
    /// malformed.
    pub fn load(&self) -> Result<Option<NovedadConfig>, CoreError> {
        match self.store.get(CONFIG, NOVEDAD_CONFIG_KEY)? {
            Some(doc) => {
                let config: NovedadConfig = doc.decode()?;
                // Re-validate: the document may have been edited by hand.
                Ok(Some(NovedadConfig::new(config.entries)?))
            }
            None => Ok(None),
        }
    }

    /// Loads the configuration, failing if it has never been saved.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConfigMissing` if absent.
    pub fn require(&self) -> Result<NovedadConfig, CoreError> {
        self.load()?.ok_or(CoreError::ConfigMissing)
    }

    /// Loads the configuration for a rollover prune. A missing configuration
    /// is logged and means nothing survives.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load_for_prune(&self) -> Result<Option<NovedadConfig>, CoreError> {
        let config: Option<NovedadConfig> = self.load()?;
        if config.is_none() {
            warn!(
                error = %CoreError::ConfigMissing,
                "No novedad configuration; no novedad survives this rollover"
            );
        }
        Ok(config)
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn save(&self, config: &NovedadConfig) -> Result<(), CoreError> {
        let validated: NovedadConfig = NovedadConfig::new(config.entries.clone())?;
        let body = serde_json::to_value(&validated).map_err(store_serialization)?;
        self.store.set(CONFIG, NOVEDAD_CONFIG_KEY, body, false)?;
        info!(entries = validated.entries.len(), "Novedad configuration saved");
        Ok(())
    }
}

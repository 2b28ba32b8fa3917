// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Novedades: operator-set incident flags on a unit.
//!
//! A unit with any active novedad must not receive new assignments. That
//! rule is enforced by callers; this module only models the flags and the
//! retention policy applied at rollover.

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An incident flag set on a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Novedad {
    /// Incident code (e.g. `MEC` for mechanical failure).
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the flag is currently in effect.
    pub active: bool,
    /// When the flag was set.
    pub set_at: DateTime<Utc>,
}

/// One configured novedad code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovedadConfigEntry {
    /// Incident code.
    pub code: String,
    /// Default description shown to operators.
    pub description: String,
    /// Whether operators may currently set this code.
    pub enabled: bool,
    /// Whether the flag is kept across the daily rollover.
    pub survives_rollover: bool,
}

/// Global novedad configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NovedadConfig {
    /// Configured codes.
    pub entries: Vec<NovedadConfigEntry>,
}

impl NovedadConfig {
    /// Creates a configuration, rejecting duplicate or empty codes.
    ///
    /// # Errors
    ///
    /// Returns an error if a code is empty or appears more than once.
    pub fn new(entries: Vec<NovedadConfigEntry>) -> Result<Self, DomainError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for entry in &entries {
            crate::validation::validate_novedad_code(&entry.code)?;
            if !seen.insert(entry.code.as_str()) {
                return Err(DomainError::DuplicateNovedadCode(entry.code.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Looks up a configured code.
    #[must_use]
    pub fn entry(&self, code: &str) -> Option<&NovedadConfigEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Returns true if flags with this code are kept across a rollover.
    ///
    /// Codes missing from the configuration do not survive.
    #[must_use]
    pub fn survives(&self, code: &str) -> bool {
        self.entry(code).is_some_and(|e| e.survives_rollover)
    }

    /// Returns true if operators may set this code.
    #[must_use]
    pub fn is_enabled(&self, code: &str) -> bool {
        self.entry(code).is_some_and(|e| e.enabled)
    }
}

/// Splits a unit's novedades into those kept and those dropped by a rollover.
///
/// With no configuration at all nothing survives.
#[must_use]
pub fn retain_surviving(
    entries: Vec<Novedad>,
    config: Option<&NovedadConfig>,
) -> (Vec<Novedad>, Vec<Novedad>) {
    entries
        .into_iter()
        .partition(|n| config.is_some_and(|c| c.survives(&n.code)))
}

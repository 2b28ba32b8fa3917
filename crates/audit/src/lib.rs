// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use chrono::{DateTime, Utc};
use despacho_domain::DispatchDate;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Represents the entity performing an action.
///
/// An actor is any identifiable entity that initiates a state change.
/// This could be an operator at a console or the midnight scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The type of actor (e.g., "operator", "admin", "scheduler").
    pub actor_type: String,
}

impl Actor {
    /// Creates a new Actor.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this actor
    /// * `actor_type` - The type of actor
    #[must_use]
    pub const fn new(id: String, actor_type: String) -> Self {
        Self { id, actor_type }
    }

    /// The automatic midnight trigger.
    #[must_use]
    pub fn scheduler() -> Self {
        Self::new(String::from("midnight-timer"), String::from("scheduler"))
    }
}

/// Represents the reason or trigger for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// A unique identifier for this cause (e.g., request ID, timer tick).
    pub id: String,
    /// A description of the cause.
    pub description: String,
}

impl Cause {
    /// Creates a new Cause.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this cause
    /// * `description` - A description of what triggered this action
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// Represents the specific action performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The name of the action (e.g., "`ExecuteRollover`", "`RecoverOrphans`").
    pub name: String,
    /// Optional additional details about the action.
    pub details: Option<String>,
}

impl Action {
    /// Creates a new Action.
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// A summary of the rollover-relevant state at a point in time.
///
/// Kept as a flat `key=value` string so a failed or partial rollover can be
/// reconciled by hand from the log alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// A string representation of the state.
    pub data: String,
}

impl StateSnapshot {
    /// Creates a new `StateSnapshot`.
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }

    /// Builds a snapshot from ordered `key=value` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, String)]) -> Self {
        let data: String = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<String>>()
            .join(",");
        Self { data }
    }
}

/// An immutable audit event representing a rollover-family operation.
///
/// Every successful rollover, orphan recovery or purge produces exactly one
/// audit event, committed in the same atomic batch as the change it records.
/// Audit events capture:
/// - Who performed the action (actor)
/// - Why it was performed (cause)
/// - What action was performed (action)
/// - The state before the operation (before)
/// - The state after the operation (after)
/// - The dispatch date the operation archived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The store key of this event, once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// The actor who initiated this state change.
    pub actor: Actor,
    /// The cause or reason for this state change.
    pub cause: Cause,
    /// The action that was performed.
    pub action: Action,
    /// The state before the operation.
    pub before: StateSnapshot,
    /// The state after the operation.
    pub after: StateSnapshot,
    /// The dispatch date the operation archived under.
    pub date: DispatchDate,
    /// When the operation was committed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates a new `AuditEvent` without a persisted id.
    ///
    /// Once created, an audit event is immutable.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        actor: Actor,
        cause: Cause,
        action: Action,
        before: StateSnapshot,
        after: StateSnapshot,
        date: DispatchDate,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: None,
            actor,
            cause,
            action,
            before,
            after,
            date,
            occurred_at,
        }
    }

    /// Returns a copy of this event carrying its persisted id.
    #[must_use]
    pub fn with_id(mut self, event_id: String) -> Self {
        self.event_id = Some(event_id);
        self
    }

    /// Derives a sortable store key from the commit time and action name.
    ///
    /// Keys sort chronologically as plain strings.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{}-{}",
            self.occurred_at.format("%Y%m%dT%H%M%S%.6fZ"),
            self.action.name
        )
    }
}

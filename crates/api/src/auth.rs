// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Actor roles and authorization.

use crate::error::ApiError;
use despacho_audit::{Actor, Cause};
use std::str::FromStr;

/// Actor roles for authorization.
///
/// Roles apply to dispatch-center staff, never to taxi units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Supervisors with corrective authority.
    ///
    /// Admins may additionally:
    /// - force a rollover on a day that is already open
    /// - purge or recover open orders
    /// - edit units and the novedad configuration
    Admin,
    /// Dispatchers taking calls, assigning units and closing the day.
    Operator,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "operator" => Ok(Self::Operator),
            _ => Err(ApiError::InvalidInput {
                field: String::from("role"),
                message: format!("Invalid role: '{s}'. Must be 'admin' or 'operator'"),
            }),
        }
    }
}

/// An authenticated actor with an associated role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The role assigned to this actor.
    pub role: Role,
}

impl AuthenticatedActor {
    #[must_use]
    pub const fn new(id: String, role: Role) -> Self {
        Self { id, role }
    }

    /// Converts this actor into the audit representation.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.role.as_str().to_string())
    }
}

/// Builds the cause recorded for an action when the caller supplied none.
#[must_use]
pub fn default_cause(action: &str, actor: &AuthenticatedActor) -> Cause {
    Cause::new(
        format!("{action}-{}", actor.id),
        format!("{action} requested by {}", actor.id),
    )
}

/// Role-based access control for the dispatch API.
pub struct AuthorizationService;

impl AuthorizationService {
    fn require_admin(actor: &AuthenticatedActor, action: &str) -> Result<(), ApiError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Operator => Err(ApiError::Unauthorized {
                action: action.to_string(),
                required_role: String::from("Admin"),
            }),
        }
    }

    /// Only admins may close a day that is not stale.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor does not have the Admin role.
    pub fn authorize_forced_rollover(actor: &AuthenticatedActor) -> Result<(), ApiError> {
        Self::require_admin(actor, "trigger_forced_rollover")
    }

    /// Only admins may archive stranded orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor does not have the Admin role.
    pub fn authorize_recover_orphans(actor: &AuthenticatedActor) -> Result<(), ApiError> {
        Self::require_admin(actor, "recover_orphans")
    }

    /// Only admins may empty the open order table.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor does not have the Admin role.
    pub fn authorize_purge_all_orders(actor: &AuthenticatedActor) -> Result<(), ApiError> {
        Self::require_admin(actor, "purge_all_orders")
    }

    /// # Errors
    ///
    /// Returns an error if the actor does not have the Admin role.
    pub fn authorize_upsert_unit(actor: &AuthenticatedActor) -> Result<(), ApiError> {
        Self::require_admin(actor, "upsert_unit")
    }

    /// # Errors
    ///
    /// Returns an error if the actor does not have the Admin role.
    pub fn authorize_save_novedad_config(actor: &AuthenticatedActor) -> Result<(), ApiError> {
        Self::require_admin(actor, "save_novedad_config")
    }
}

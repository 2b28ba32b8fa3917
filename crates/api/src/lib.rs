// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary between operator consoles and the dispatch core.
//!
//! The API enforces authorization, owns the per-client "rollover in
//! progress" flag and translates core errors into [`ApiError`]s. It holds no
//! dispatch rules of its own beyond refusing assignments to units that
//! cannot take trips.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod error;
mod handlers;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedActor, AuthorizationService, Role, default_cause};
pub use error::{ApiError, translate_core_error, translate_domain_error, translate_store_error};
pub use handlers::DispatchApi;
pub use request_response::{
    AddNovedadRequest, ArchiveResponse, AssignOrderRequest, AuditTrailResponse,
    CounterResponse, CountersResponse, CreateOrderRequest, ListArchivedDatesResponse,
    ListOrdersResponse, ListUnitsResponse, NovedadChangeResponse, NovedadConfigRequest,
    NovedadConfigResponse, NovedadesResponse, OrderResponse, PurgeOrdersResponse,
    RecoverOrphansResponse, RolloverResponse, StatusResponse, UpsertUnitRequest,
};

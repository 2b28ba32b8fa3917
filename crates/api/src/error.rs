// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use despacho::{CoreError, RolloverError};
use despacho_domain::DomainError;
use despacho_store::StoreError;
use thiserror::Error;

/// API-level errors.
///
/// These are distinct from domain and core errors and represent the API
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The actor does not have permission.
    #[error("Unauthorized: '{action}' requires {required_role} role")]
    Unauthorized {
        action: String,
        required_role: String,
    },
    /// Invalid input was provided.
    #[error("Invalid input for field '{field}': {message}")]
    InvalidInput { field: String, message: String },
    /// A dispatch rule was violated.
    #[error("Domain rule violation ({rule}): {message}")]
    DomainRuleViolation { rule: String, message: String },
    /// A requested resource was not found.
    #[error("{resource_type} not found: {message}")]
    ResourceNotFound {
        resource_type: String,
        message: String,
    },
    /// The day is already open.
    #[error("{message}")]
    RolloverNotNeeded { message: String },
    /// This client is already running a rollover.
    #[error("A rollover is already in progress")]
    RolloverInProgress,
    /// Concurrent writers kept winning; the caller may retry.
    #[error("Conflict: {message}")]
    Conflict { message: String },
    /// A rollover batch was only partly applied.
    #[error("Manual reconciliation required: {message}")]
    PartialFailure { message: String },
    /// The document store cannot be reached; the caller may retry.
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Translates a domain error into an API error.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidUnitId(msg) => ApiError::InvalidInput {
            field: String::from("unit"),
            message: msg,
        },
        DomainError::InvalidUnitNumber(number) => ApiError::InvalidInput {
            field: String::from("number"),
            message: format!("Unit number {number} is out of range"),
        },
        DomainError::InvalidNovedadCode(msg) => ApiError::InvalidInput {
            field: String::from("code"),
            message: msg,
        },
        DomainError::InvalidAddress(msg) => ApiError::InvalidInput {
            field: String::from("address"),
            message: msg,
        },
        DomainError::InvalidOrderId(msg) => ApiError::InvalidInput {
            field: String::from("order_id"),
            message: msg,
        },
        DomainError::DateParseError { date_string, error } => ApiError::InvalidInput {
            field: String::from("date"),
            message: format!("Failed to parse date '{date_string}': {error}"),
        },
        DomainError::InvalidTimezone(msg) => ApiError::InvalidInput {
            field: String::from("timezone"),
            message: msg,
        },
        DomainError::DateArithmeticOverflow { operation } => ApiError::Internal {
            message: format!("Date arithmetic overflow while {operation}"),
        },
        DomainError::UnreadableArchivedOrder { reason } => ApiError::Internal {
            message: format!("Archived order could not be read: {reason}"),
        },
        DomainError::DuplicateNovedadCode(code) => ApiError::DomainRuleViolation {
            rule: String::from("unique_novedad_code"),
            message: format!("Novedad code '{code}' is configured more than once"),
        },
        DomainError::NovedadCodeNotConfigured(code) => ApiError::DomainRuleViolation {
            rule: String::from("novedad_code_enabled"),
            message: format!("Novedad code '{code}' is not enabled in the configuration"),
        },
        DomainError::AlreadyArchived(date) => ApiError::DomainRuleViolation {
            rule: String::from("archive_immutable"),
            message: format!("An archive snapshot for {date} already exists"),
        },
    }
}

/// Translates a store error into an API error.
#[must_use]
pub fn translate_store_error(err: StoreError) -> ApiError {
    let message: String = err.to_string();
    match err {
        StoreError::Unavailable(_) | StoreError::Contention(_) => ApiError::Unavailable { message },
        StoreError::NotFound { collection, key } => ApiError::ResourceNotFound {
            resource_type: String::from("Document"),
            message: format!("{collection}/{key}"),
        },
        StoreError::PreconditionFailed { .. } => ApiError::Conflict { message },
        StoreError::Serialization(_)
        | StoreError::Database(_)
        | StoreError::Migration(_)
        | StoreError::Initialization(_) => ApiError::Internal { message },
    }
}

/// Translates a core error into an API error.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::Store(store_err) => translate_store_error(store_err),
        CoreError::Rollover(rollover_err) => translate_rollover_error(&rollover_err),
        CoreError::OrderNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Order"),
            message: format!("Order '{id}' is not open"),
        },
        CoreError::UnitNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Unit"),
            message: format!("Unit '{id}' is not registered"),
        },
        CoreError::ArchiveNotFound(date) => ApiError::ResourceNotFound {
            resource_type: String::from("Archive"),
            message: format!("No snapshot for {date}"),
        },
        CoreError::ConfigMissing => ApiError::ResourceNotFound {
            resource_type: String::from("Novedad configuration"),
            message: String::from("No novedad configuration has been saved"),
        },
        CoreError::WriteConflict { target, attempts } => ApiError::Conflict {
            message: format!("Write to {target} abandoned after {attempts} conflicting attempts"),
        },
    }
}

fn translate_rollover_error(err: &RolloverError) -> ApiError {
    let message: String = err.to_string();
    match err {
        RolloverError::NotNeeded { .. } => ApiError::RolloverNotNeeded { message },
        RolloverError::InProgress => ApiError::RolloverInProgress,
        RolloverError::PartialBatchFailure { .. } => ApiError::PartialFailure { message },
        RolloverError::Conflict { .. } => ApiError::Conflict { message },
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        translate_core_error(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

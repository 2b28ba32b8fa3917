// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::order::NewOrder;
use crate::types::{Unit, UnitId};

const MAX_CODE_LEN: usize = 16;

/// Validates a unit identifier.
///
/// # Errors
///
/// Returns an error if the id is empty or contains characters that cannot be
/// used as a document key (`/`, whitespace).
pub fn validate_unit_id(unit: &UnitId) -> Result<(), DomainError> {
    let id: &str = unit.as_str();
    if id.is_empty() {
        return Err(DomainError::InvalidUnitId(String::from(
            "Unit id cannot be empty",
        )));
    }
    if id.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(DomainError::InvalidUnitId(format!(
            "Unit id '{id}' must not contain '/' or whitespace"
        )));
    }
    Ok(())
}

/// Validates a unit's fields.
///
/// # Errors
///
/// Returns an error if the id is invalid or the number is zero.
pub fn validate_unit(unit: &Unit) -> Result<(), DomainError> {
    validate_unit_id(&unit.id)?;
    if unit.number == 0 {
        return Err(DomainError::InvalidUnitNumber(unit.number));
    }
    Ok(())
}

/// Validates a novedad code.
///
/// Codes are short uppercase-insensitive tokens such as `MEC` or `TALLER`.
///
/// # Errors
///
/// Returns an error if the code is empty, too long, or not alphanumeric.
pub fn validate_novedad_code(code: &str) -> Result<(), DomainError> {
    if code.is_empty() {
        return Err(DomainError::InvalidNovedadCode(String::from(
            "Code cannot be empty",
        )));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(DomainError::InvalidNovedadCode(format!(
            "Code '{code}' is longer than {MAX_CODE_LEN} characters"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DomainError::InvalidNovedadCode(format!(
            "Code '{code}' must be alphanumeric"
        )));
    }
    Ok(())
}

/// Validates intake data for a new order.
///
/// # Errors
///
/// Returns an error if the address is empty.
pub fn validate_new_order(order: &NewOrder) -> Result<(), DomainError> {
    // Rule: an order without a pickup address cannot be dispatched
    if order.address.trim().is_empty() {
        return Err(DomainError::InvalidAddress(String::from(
            "Address cannot be empty",
        )));
    }
    Ok(())
}

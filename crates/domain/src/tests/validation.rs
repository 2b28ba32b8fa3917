// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    DomainError, NewOrder, Unit, UnitId, validate_new_order, validate_novedad_code,
    validate_unit, validate_unit_id,
};

fn create_test_new_order(address: &str) -> NewOrder {
    NewOrder {
        client_ref: String::from("3001234567"),
        address: address.to_string(),
        notes: String::new(),
        is_parcel: false,
    }
}

#[test]
fn test_validate_unit_id_accepts_number() {
    assert!(validate_unit_id(&UnitId::new("12")).is_ok());
}

#[test]
fn test_validate_unit_id_rejects_empty() {
    let result: Result<(), DomainError> = validate_unit_id(&UnitId::new(""));
    assert!(matches!(result, Err(DomainError::InvalidUnitId(_))));
}

#[test]
fn test_validate_unit_rejects_zero_number() {
    let unit: Unit = Unit::new(UnitId::new("0"), 0);
    assert_eq!(validate_unit(&unit), Err(DomainError::InvalidUnitNumber(0)));
}

#[test]
fn test_validate_novedad_code() {
    assert!(validate_novedad_code("MEC").is_ok());
    assert!(validate_novedad_code("SIN_GAS").is_ok());
    assert!(validate_novedad_code("").is_err());
    assert!(validate_novedad_code("A B").is_err());
    assert!(validate_novedad_code("ABCDEFGHIJKLMNOPQ").is_err());
}

#[test]
fn test_validate_new_order_requires_address() {
    assert!(validate_new_order(&create_test_new_order("Calle 10 # 4-20")).is_ok());
    assert!(matches!(
        validate_new_order(&create_test_new_order("   ")),
        Err(DomainError::InvalidAddress(_))
    ));
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::DomainError;

#[test]
fn test_domain_error_display() {
    let err: DomainError = DomainError::InvalidUnitId(String::from("test"));
    assert_eq!(format!("{err}"), "Invalid unit id: test");

    let err: DomainError = DomainError::InvalidUnitNumber(0);
    assert_eq!(
        format!("{err}"),
        "Invalid unit number: 0. Must be greater than 0"
    );

    let err: DomainError = DomainError::InvalidNovedadCode(String::from("test"));
    assert_eq!(format!("{err}"), "Invalid novedad code: test");

    let err: DomainError = DomainError::DateParseError {
        date_string: String::from("2024-13-01"),
        error: String::from("input is out of range"),
    };
    assert_eq!(
        format!("{err}"),
        "Failed to parse date '2024-13-01': input is out of range"
    );

    let err: DomainError = DomainError::InvalidTimezone(String::from("Mars/Olympus"));
    assert_eq!(format!("{err}"), "Invalid timezone: 'Mars/Olympus'");

    let err: DomainError = DomainError::AlreadyArchived(String::from("2024-01-01"));
    assert_eq!(
        format!("{err}"),
        "An archive snapshot for 2024-01-01 already exists"
    );

    let err: DomainError = DomainError::NovedadCodeNotConfigured(String::from("MEC"));
    assert_eq!(
        format!("{err}"),
        "Novedad code 'MEC' is not configured or not enabled"
    );
}

#[test]
fn test_domain_error_is_std_error() {
    let err: Box<dyn std::error::Error> =
        Box::new(DomainError::InvalidAddress(String::from("empty")));
    assert_eq!(err.to_string(), "Invalid address: empty");
}

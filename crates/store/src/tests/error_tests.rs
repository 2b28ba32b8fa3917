// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::StoreError;

#[test]
fn test_retryable_classification() {
    assert!(StoreError::Unavailable(String::from("offline")).is_retryable());
    assert!(StoreError::Contention(String::from("locked")).is_retryable());
    assert!(!StoreError::Database(String::from("bad sql")).is_retryable());
    assert!(
        !StoreError::NotFound {
            collection: String::from("orders"),
            key: String::from("o-1"),
        }
        .is_retryable()
    );
}

#[test]
fn test_precondition_failed_display() {
    let err: StoreError = StoreError::PreconditionFailed {
        collection: String::from("system"),
        key: String::from("cierre"),
        expected: Some(2),
        actual: None,
    };

    assert_eq!(
        err.to_string(),
        "Precondition failed for system/cierre: expected revision 2, found absent"
    );
}

#[test]
fn test_serde_error_converts_to_serialization() {
    let parse: Result<serde_json::Value, serde_json::Error> = serde_json::from_str("{not json");
    let err: StoreError = parse.unwrap_err().into();

    assert!(matches!(err, StoreError::Serialization(_)));
}

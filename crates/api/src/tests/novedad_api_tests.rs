// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    TestApi, bogota, create_seeded_api, create_test_admin, create_test_api,
    create_test_unit,
};
use crate::{AddNovedadRequest, ApiError, NovedadChangeResponse, NovedadConfigRequest};
use despacho_domain::NovedadConfigEntry;

fn flag(code: &str) -> AddNovedadRequest {
    AddNovedadRequest {
        code: code.to_string(),
        description: None,
    }
}

#[test]
fn test_add_uses_configured_description() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 9, 0));

    test.api.add_novedad("14", &flag("ALM")).unwrap();

    let listed = test.api.list_novedades("14").unwrap().novedades;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description, "Almuerzo");
}

#[test]
fn test_add_and_remove_are_idempotent() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 9, 0));

    let first: NovedadChangeResponse = test.api.add_novedad("14", &flag("MEC")).unwrap();
    let second: NovedadChangeResponse = test.api.add_novedad("14", &flag("MEC")).unwrap();
    let removed: NovedadChangeResponse = test.api.remove_novedad("14", "MEC").unwrap();
    let removed_again: NovedadChangeResponse = test.api.remove_novedad("14", "MEC").unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert!(removed.changed);
    assert!(!removed_again.changed);
}

#[test]
fn test_add_rejects_disabled_or_unknown_code() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 9, 0));

    for code in ["OLD", "XYZ"] {
        assert!(matches!(
            test.api.add_novedad("14", &flag(code)),
            Err(ApiError::DomainRuleViolation { ref rule, .. }) if rule == "novedad_code_enabled"
        ));
    }
    assert!(test.api.list_novedades("14").unwrap().novedades.is_empty());
}

#[test]
fn test_add_without_config_is_not_found() {
    let test: TestApi = create_test_api(bogota(2024, 3, 10, 9, 0));
    test.api
        .upsert_unit(&create_test_admin(), &create_test_unit("14", 14))
        .unwrap();

    assert!(matches!(
        test.api.add_novedad("14", &flag("MEC")),
        Err(ApiError::ResourceNotFound { .. })
    ));
    assert!(matches!(
        test.api.get_novedad_config(),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_config_rejects_duplicate_codes() {
    let test: TestApi = create_test_api(bogota(2024, 3, 10, 9, 0));
    let entry: NovedadConfigEntry = NovedadConfigEntry {
        code: String::from("MEC"),
        description: String::from("Falla mecánica"),
        enabled: true,
        survives_rollover: true,
    };

    let result = test.api.save_novedad_config(
        &create_test_admin(),
        NovedadConfigRequest {
            entries: vec![entry.clone(), entry],
        },
    );

    assert!(matches!(
        result,
        Err(ApiError::DomainRuleViolation { ref rule, .. }) if rule == "unique_novedad_code"
    ));
}

#[test]
fn test_config_round_trips() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 9, 0));

    let codes: Vec<String> = test
        .api
        .get_novedad_config()
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.code)
        .collect();

    assert_eq!(codes, vec!["MEC", "ALM", "OLD"]);
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{TestContext, bogota, create_test_novedad_config};
use crate::{CoreError, PrunePlan};
use despacho_domain::{DomainError, Novedad, NovedadConfig, NovedadConfigEntry, UnitId};

fn create_context() -> TestContext {
    TestContext::new(bogota(2024, 3, 10, 10, 0))
}

#[test]
fn test_add_is_idempotent() {
    let ctx: TestContext = create_context();
    let unit: UnitId = UnitId::new("14");

    assert!(ctx.novedades.add(&unit, "MEC", "Pinchazo").unwrap());
    assert!(!ctx.novedades.add(&unit, "MEC", "Pinchazo").unwrap());

    let active: Vec<Novedad> = ctx.novedades.list_active(&unit).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].description, "Pinchazo");
    assert_eq!(ctx.novedades.count_active(&unit).unwrap(), 1);
}

#[test]
fn test_remove_absent_code_is_noop() {
    let ctx: TestContext = create_context();
    let unit: UnitId = UnitId::new("14");

    assert!(!ctx.novedades.remove(&unit, "MEC").unwrap());

    ctx.novedades.add(&unit, "MEC", "").unwrap();
    assert!(ctx.novedades.remove(&unit, "MEC").unwrap());
    assert!(!ctx.novedades.remove(&unit, "MEC").unwrap());
    assert_eq!(ctx.novedades.count_active(&unit).unwrap(), 0);
}

#[test]
fn test_add_rejects_malformed_code() {
    let ctx: TestContext = create_context();
    let result: Result<bool, CoreError> = ctx.novedades.add(&UnitId::new("14"), "MEC FALLA", "");

    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(DomainError::InvalidNovedadCode(_)))
    ));
}

#[test]
fn test_prune_keeps_only_surviving_codes() {
    let ctx: TestContext = create_context();
    let first: UnitId = UnitId::new("14");
    let second: UnitId = UnitId::new("21");
    ctx.novedades.add(&first, "MEC", "").unwrap();
    ctx.novedades.add(&first, "ALM", "").unwrap();
    ctx.novedades.add(&second, "ALM", "").unwrap();
    ctx.novedades.add(&second, "XYZ", "unknown code").unwrap();

    let config: NovedadConfig = create_test_novedad_config();
    let plan: PrunePlan = ctx.novedades.prune_non_surviving(Some(&config)).unwrap();

    assert_eq!(plan.units_updated, 2);
    assert_eq!(plan.entries_dropped, 3);
    let kept: Vec<String> = ctx
        .novedades
        .list_active(&first)
        .unwrap()
        .into_iter()
        .map(|n| n.code)
        .collect();
    assert_eq!(kept, vec![String::from("MEC")]);
    assert_eq!(ctx.novedades.count_active(&second).unwrap(), 0);
}

#[test]
fn test_prune_without_config_drops_everything() {
    let ctx: TestContext = create_context();
    let unit: UnitId = UnitId::new("14");
    ctx.novedades.add(&unit, "MEC", "").unwrap();

    let plan: PrunePlan = ctx.novedades.prune_non_surviving(None).unwrap();

    assert_eq!(plan.entries_dropped, 1);
    assert_eq!(ctx.novedades.count_active(&unit).unwrap(), 0);
}

#[test]
fn test_prune_with_nothing_to_drop_writes_nothing() {
    let ctx: TestContext = create_context();
    let unit: UnitId = UnitId::new("14");
    ctx.novedades.add(&unit, "MEC", "").unwrap();
    let revision: u64 = ctx.store.get("novedades", "14").unwrap().unwrap().revision;

    let config: NovedadConfig = create_test_novedad_config();
    let plan: PrunePlan = ctx.novedades.prune_non_surviving(Some(&config)).unwrap();

    assert_eq!(plan, PrunePlan::default());
    assert_eq!(
        ctx.store.get("novedades", "14").unwrap().unwrap().revision,
        revision
    );
}

#[test]
fn test_config_round_trip() {
    let ctx: TestContext = create_context();
    assert_eq!(ctx.novedad_config.load().unwrap(), None);
    assert_eq!(ctx.novedad_config.require(), Err(CoreError::ConfigMissing));

    let config: NovedadConfig = create_test_novedad_config();
    ctx.novedad_config.save(&config).unwrap();

    assert_eq!(ctx.novedad_config.require().unwrap(), config);
}

#[test]
fn test_config_rejects_duplicate_codes() {
    let ctx: TestContext = create_context();
    let entry: NovedadConfigEntry = NovedadConfigEntry {
        code: String::from("MEC"),
        description: String::new(),
        enabled: true,
        survives_rollover: true,
    };
    let config: NovedadConfig = NovedadConfig {
        entries: vec![entry.clone(), entry],
    };

    let result: Result<(), CoreError> = ctx.novedad_config.save(&config);
    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(DomainError::DuplicateNovedadCode(_)))
    ));
}

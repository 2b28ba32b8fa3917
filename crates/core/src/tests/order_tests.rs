// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{Fault, FaultyStore, TestContext, bogota, create_test_intake};
use crate::CoreError;
use chrono::Duration;
use despacho_domain::{DomainError, Order, OrderId, UnitId};
use std::sync::Arc;

#[test]
fn test_create_order_is_open_and_unassigned() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));

    let order: Order = ctx.orders.create(create_test_intake("Calle 10 # 4-20")).unwrap();

    assert!(order.is_unassigned());
    assert!(order.id.as_str().starts_with("20240310150000-"));
    assert_eq!(ctx.orders.get(&order.id).unwrap(), order);
}

#[test]
fn test_create_rejects_empty_address() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));

    let result: Result<Order, CoreError> = ctx.orders.create(create_test_intake("   "));

    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(DomainError::InvalidAddress(_)))
    ));
}

#[test]
fn test_ids_are_unique_within_the_same_second() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));

    let first: Order = ctx.orders.create(create_test_intake("A")).unwrap();
    let second: Order = ctx.orders.create(create_test_intake("B")).unwrap();

    assert_ne!(first.id, second.id);
}

#[test]
fn test_create_retries_with_a_new_id_when_taken() {
    let store: Arc<FaultyStore> = Arc::new(FaultyStore::new());
    let ctx: TestContext = TestContext::with_store(store.clone(), bogota(2024, 3, 10, 10, 0));
    store.set_fault(Fault::StaleOnce);

    let order: Order = ctx.orders.create(create_test_intake("A")).unwrap();

    assert!(order.id.as_str().starts_with("20240310150000-0002-"));
    assert_eq!(ctx.orders.list_open().unwrap(), vec![order]);
}

#[test]
fn test_first_assignment_increments_counter() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let order: Order = ctx.orders.create(create_test_intake("A")).unwrap();
    let unit: UnitId = UnitId::new("14");

    let assigned: Order = ctx.orders.assign(&order.id, &unit).unwrap();

    assert_eq!(assigned.assigned_unit, Some(unit.clone()));
    assert_eq!(assigned.reassignment_history.len(), 1);
    assert_eq!(ctx.ledger.counts_today().unwrap().get(&unit), Some(&1));
}

#[test]
fn test_reassignment_moves_the_trip() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let order: Order = ctx.orders.create(create_test_intake("A")).unwrap();
    let first: UnitId = UnitId::new("14");
    let second: UnitId = UnitId::new("21");

    ctx.orders.assign(&order.id, &first).unwrap();
    ctx.clock.advance(Duration::minutes(3));
    let reassigned: Order = ctx.orders.assign(&order.id, &second).unwrap();

    assert_eq!(reassigned.assigned_unit, Some(second.clone()));
    assert_eq!(reassigned.reassignment_history.len(), 2);
    let counts = ctx.ledger.counts_today().unwrap();
    assert_eq!(counts.get(&first), Some(&0));
    assert_eq!(counts.get(&second), Some(&1));
}

#[test]
fn test_reassigning_same_unit_does_not_double_count() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let order: Order = ctx.orders.create(create_test_intake("A")).unwrap();
    let unit: UnitId = UnitId::new("14");

    ctx.orders.assign(&order.id, &unit).unwrap();
    ctx.orders.assign(&order.id, &unit).unwrap();

    assert_eq!(ctx.ledger.counts_today().unwrap().get(&unit), Some(&1));
}

#[test]
fn test_assign_unknown_order_is_not_found() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let missing: OrderId = OrderId::new("nope");

    assert_eq!(
        ctx.orders.assign(&missing, &UnitId::new("14")),
        Err(CoreError::OrderNotFound(missing))
    );
}

#[test]
fn test_confirm_keeps_first_timestamp() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let order: Order = ctx.orders.create(create_test_intake("A")).unwrap();

    let confirmed: Order = ctx.orders.confirm(&order.id).unwrap();
    ctx.clock.advance(Duration::minutes(10));
    let again: Order = ctx.orders.confirm(&order.id).unwrap();

    assert!(confirmed.confirmed);
    assert_eq!(again.confirmed_at, confirmed.confirmed_at);
}

#[test]
fn test_list_open_is_ordered_by_request_time() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    let early: Order = ctx.orders.create(create_test_intake("A")).unwrap();
    ctx.clock.advance(Duration::minutes(5));
    let late: Order = ctx.orders.create(create_test_intake("B")).unwrap();

    let ids: Vec<OrderId> = ctx
        .orders
        .list_open()
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();

    assert_eq!(ids, vec![early.id, late.id]);
}

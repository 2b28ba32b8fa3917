// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{TestContext, bogota, create_test_intake, create_test_trigger, date};
use crate::AuditLog;
use chrono::Duration;
use despacho_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use despacho_store::Batch;

fn create_test_event(name: &str) -> AuditEvent {
    AuditEvent::new(
        Actor::new(String::from("op-1"), String::from("operator")),
        Cause::new(String::from("req-1"), String::from("test")),
        Action::new(name.to_string(), None),
        StateSnapshot::new(String::from("a=1")),
        StateSnapshot::new(String::from("a=2")),
        date(2024, 3, 10),
        bogota(2024, 3, 10, 0, 0),
    )
}

#[test]
fn test_colliding_keys_get_a_suffix() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 0, 0));
    let log: AuditLog = AuditLog::new(ctx.store.clone());
    let event: AuditEvent = create_test_event("ExecuteRollover");

    let mut first: Batch = Batch::new();
    let first_key: String = log.stage(&mut first, &event).unwrap();
    ctx.store.commit(first).unwrap();
    let mut second: Batch = Batch::new();
    let second_key: String = log.stage(&mut second, &event).unwrap();
    ctx.store.commit(second).unwrap();

    assert_eq!(first_key, event.storage_key());
    assert_eq!(second_key, format!("{}-2", event.storage_key()));
    assert_eq!(log.list().unwrap().len(), 2);
}

#[test]
fn test_events_are_listed_newest_first() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 9, 0));
    ctx.orders.create(create_test_intake("A")).unwrap();
    ctx.engine.recover_orphans(&create_test_trigger()).unwrap();

    ctx.clock.advance(Duration::hours(1));
    ctx.orders.create(create_test_intake("B")).unwrap();
    ctx.engine.purge_all_orders(&create_test_trigger()).unwrap();

    let names: Vec<String> = ctx
        .engine
        .list_audit_events()
        .unwrap()
        .into_iter()
        .map(|e| e.action.name)
        .collect();
    assert_eq!(
        names,
        vec![String::from("PurgeAllOrders"), String::from("RecoverOrphans")]
    );
}

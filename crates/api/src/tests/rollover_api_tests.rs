// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    OutageStore, TestApi, bogota, create_seeded_api, create_test_admin, create_test_api_with_store,
    create_test_cause, create_test_operator, create_test_order,
};
use crate::{
    ApiError, ArchiveResponse, ListArchivedDatesResponse, RolloverResponse, StatusResponse,
};
use despacho::{Clock, Trigger};
use despacho_domain::DispatchDate;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn date(year: i32, month: u32, day: u32) -> DispatchDate {
    DispatchDate::from_ymd(year, month, day).unwrap()
}

/// Closes 2024-03-09 so the api starts on an open day, then moves the clock
/// past the next midnight.
fn create_stale_api() -> TestApi {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 9, 8, 0));
    test.api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();
    test.api.create_order(create_test_order("Calle 10")).unwrap();
    test.api.create_order(create_test_order("Carrera 7")).unwrap();
    test.clock.set(bogota(2024, 3, 10, 0, 10));
    test
}

#[test]
fn test_manual_rollover_closes_stale_day() {
    let test: TestApi = create_stale_api();

    let response: RolloverResponse = test
        .api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();

    assert_eq!(response.orders_archived, 2);
    assert_eq!(response.archive_date, date(2024, 3, 9));
    assert_eq!(response.new_rollover_date, date(2024, 3, 10));
    assert!(test.api.list_open_orders().unwrap().orders.is_empty());
    assert!(!test.api.is_busy());
}

#[test]
fn test_failed_manual_rollover_leaves_day_stale_and_api_idle() {
    let store: Arc<OutageStore> = Arc::new(OutageStore::new());
    let test: TestApi = create_test_api_with_store(store.clone(), bogota(2024, 3, 9, 8, 0));
    test.api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();
    test.api.create_order(create_test_order("Calle 10")).unwrap();
    test.clock.set(bogota(2024, 3, 10, 0, 10));
    store.set_down(true);

    let result: Result<RolloverResponse, ApiError> = test
        .api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause());

    assert!(matches!(result, Err(ApiError::Unavailable { .. })));
    assert!(!test.api.is_busy());
    let status: StatusResponse = test.api.get_status(true).unwrap();
    assert!(status.needs_rollover);
    assert_eq!(status.last_rollover_date, Some(date(2024, 3, 9)));
    assert_eq!(test.api.list_open_orders().unwrap().orders.len(), 1);
}

#[test]
fn test_manual_rollover_on_open_day_is_not_needed() {
    let test: TestApi = create_stale_api();
    test.api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();

    let result = test
        .api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause());

    assert!(matches!(result, Err(ApiError::RolloverNotNeeded { .. })));
    assert!(!test.api.is_busy());
}

#[test]
fn test_busy_client_refuses_second_rollover() {
    let test: TestApi = create_stale_api();
    test.api.busy.store(true, Ordering::Release);

    let result = test
        .api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause());

    assert_eq!(result, Err(ApiError::RolloverInProgress));
    assert_eq!(test.api.list_open_orders().unwrap().orders.len(), 2);
    assert!(test.api.get_status(true).unwrap().needs_rollover);
}

#[test]
fn test_status_reports_prompt_only_near_midnight() {
    let test: TestApi = create_stale_api();

    let near_midnight: StatusResponse = test.api.get_status(true).unwrap();
    test.clock.set(bogota(2024, 3, 10, 11, 0));
    let mid_morning: StatusResponse = test.api.get_status(true).unwrap();

    assert!(near_midnight.needs_rollover && near_midnight.prompt);
    assert!(mid_morning.needs_rollover && !mid_morning.prompt);
}

#[test]
fn test_clear_status_cache() {
    let test: TestApi = create_stale_api();
    assert!(test.api.get_status(false).unwrap().needs_rollover);
    test.api
        .engine()
        .execute_due_rollover(&Trigger::scheduler(test.clock.now()))
        .unwrap();

    test.api.clear_status_cache();

    assert!(!test.api.get_status(false).unwrap().needs_rollover);
}

#[test]
fn test_forced_rollover_as_admin() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 15, 0));
    test.api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();
    test.api.create_order(create_test_order("A")).unwrap();

    let response: RolloverResponse = test
        .api
        .trigger_forced_rollover(&create_test_admin(), create_test_cause())
        .unwrap();

    assert_eq!(response.archive_date, date(2024, 3, 10));
    assert_eq!(response.orders_archived, 1);
}

#[test]
fn test_archive_listing_and_lookup() {
    let test: TestApi = create_stale_api();
    test.api
        .trigger_manual_rollover(&create_test_operator(), create_test_cause())
        .unwrap();

    let listing: ListArchivedDatesResponse = test.api.list_archived_dates().unwrap();
    let archive: ArchiveResponse = test.api.get_archive("2024-03-09").unwrap();

    assert_eq!(listing.dates[0].date, date(2024, 3, 9));
    assert_eq!(listing.dates[0].order_count, 2);
    assert_eq!(archive.order_count, 2);
    assert_eq!(archive.unassigned_count, 2);
}

#[test]
fn test_get_archive_errors() {
    let test: TestApi = create_stale_api();

    assert!(matches!(
        test.api.get_archive("09/03/2024"),
        Err(ApiError::InvalidInput { .. })
    ));
    assert!(matches!(
        test.api.get_archive("2023-01-01"),
        Err(ApiError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_recover_and_purge_as_admin() {
    let test: TestApi = create_seeded_api(bogota(2024, 3, 10, 15, 0));
    test.api.create_order(create_test_order("A")).unwrap();

    let recovered = test
        .api
        .recover_orphans(&create_test_admin(), create_test_cause())
        .unwrap();
    test.api.create_order(create_test_order("B")).unwrap();
    let purged = test
        .api
        .purge_all_orders(&create_test_admin(), create_test_cause())
        .unwrap();

    assert_eq!(recovered.recovered, 1);
    assert_eq!(recovered.archive_date, date(2024, 3, 9));
    assert_eq!(purged.purged, 1);
    assert_eq!(purged.archive_date, date(2024, 3, 10));
    let names: Vec<String> = test
        .api
        .list_audit_events()
        .unwrap()
        .events
        .into_iter()
        .map(|e| e.action.name)
        .collect();
    assert!(names.contains(&String::from("RecoverOrphans")));
    assert!(names.contains(&String::from("PurgeAllOrders")));
}

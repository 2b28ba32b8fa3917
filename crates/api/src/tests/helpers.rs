// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use chrono::{DateTime, TimeZone, Utc};
use despacho::{EngineConfig, ManualClock};
use despacho_audit::Cause;
use despacho_domain::{NovedadConfigEntry, Tz};
use despacho_store::{
    Batch, CommitReceipt, Document, DocumentStore, MemoryStore, StoreError, Subscription,
    SubscriptionFilter,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    AuthenticatedActor, CreateOrderRequest, DispatchApi, NovedadConfigRequest, Role,
    UpsertUnitRequest,
};

pub fn bogota(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Tz::America__Bogota
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn create_test_admin() -> AuthenticatedActor {
    AuthenticatedActor::new(String::from("admin-123"), Role::Admin)
}

pub fn create_test_operator() -> AuthenticatedActor {
    AuthenticatedActor::new(String::from("operator-456"), Role::Operator)
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-456"), String::from("API request"))
}

pub fn create_test_order(address: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        client_ref: String::from("3001234567"),
        address: address.to_string(),
        notes: String::new(),
        is_parcel: false,
    }
}

pub fn create_test_unit(id: &str, number: u32) -> UpsertUnitRequest {
    UpsertUnitRequest {
        id: id.to_string(),
        number,
        enabled: true,
        disabled_checkbox: false,
    }
}

pub fn create_test_config_request() -> NovedadConfigRequest {
    NovedadConfigRequest {
        entries: vec![
            NovedadConfigEntry {
                code: String::from("MEC"),
                description: String::from("Falla mecánica"),
                enabled: true,
                survives_rollover: true,
            },
            NovedadConfigEntry {
                code: String::from("ALM"),
                description: String::from("Almuerzo"),
                enabled: true,
                survives_rollover: false,
            },
            NovedadConfigEntry {
                code: String::from("OLD"),
                description: String::from("Retirado"),
                enabled: false,
                survives_rollover: false,
            },
        ],
    }
}

pub struct TestApi {
    pub api: DispatchApi,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<ManualClock>,
}

/// An in-memory store whose commits fail while it is marked down. Reads
/// keep working.
#[derive(Default)]
pub struct OutageStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl OutageStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl DocumentStore for OutageStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, key)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list(collection)
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(String::from("injected outage")));
        }
        self.inner.commit(batch)
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        self.inner.subscribe(filter)
    }
}

/// An API over an empty in-memory store, in Bogota time.
pub fn create_test_api(now: DateTime<Utc>) -> TestApi {
    create_test_api_with_store(Arc::new(MemoryStore::new()), now)
}

pub fn create_test_api_with_store(store: Arc<dyn DocumentStore>, now: DateTime<Utc>) -> TestApi {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::new(now));
    let api: DispatchApi = DispatchApi::new(
        store.clone(),
        clock.clone(),
        EngineConfig::new(Tz::America__Bogota),
    );
    TestApi { api, store, clock }
}

/// An API with one available unit (`14`) and the novedad configuration.
pub fn create_seeded_api(now: DateTime<Utc>) -> TestApi {
    let test: TestApi = create_test_api(now);
    let admin: AuthenticatedActor = create_test_admin();
    test.api
        .upsert_unit(&admin, &create_test_unit("14", 14))
        .unwrap();
    test.api
        .save_novedad_config(&admin, create_test_config_request())
        .unwrap();
    test
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::collections::{ROLLOVER_STATE_KEY, SYSTEM};
use crate::{
    ArchiveStore, Clock, CounterLedger, EngineConfig, ManualClock, NovedadConfigStore,
    NovedadRegistry, OrderTable, RolloverEngine, Trigger, UnitRegistry,
};
use chrono::{DateTime, TimeZone, Utc};
use despacho_audit::{Actor, Cause};
use despacho_domain::{
    DispatchDate, NewOrder, NovedadConfig, NovedadConfigEntry, RolloverState, Tz,
};
use despacho_store::{
    Batch, CommitReceipt, Document, DocumentStore, MemoryStore, Operation, StoreError,
    Subscription, SubscriptionFilter,
};
use std::sync::{Arc, Mutex};

/// Local time in Bogota (UTC-5, no DST) expressed in UTC.
pub fn bogota(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Tz::America__Bogota
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn date(year: i32, month: u32, day: u32) -> DispatchDate {
    DispatchDate::from_ymd(year, month, day).unwrap()
}

pub fn create_test_config() -> EngineConfig {
    EngineConfig::new(Tz::America__Bogota)
}

pub fn create_test_trigger() -> Trigger {
    Trigger::new(
        Actor::new(String::from("op-1"), String::from("operator")),
        Cause::new(String::from("req-1"), String::from("Cierre button")),
    )
}

pub fn create_test_intake(address: &str) -> NewOrder {
    NewOrder {
        client_ref: String::from("3001234567"),
        address: address.to_string(),
        notes: String::new(),
        is_parcel: false,
    }
}

pub fn create_test_novedad_config() -> NovedadConfig {
    NovedadConfig::new(vec![
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
    ])
    .unwrap()
}

/// One client's view of a shared store.
pub struct TestContext {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<ManualClock>,
    pub config: EngineConfig,
    pub engine: RolloverEngine,
    pub orders: OrderTable,
    pub ledger: CounterLedger,
    pub novedades: NovedadRegistry,
    pub novedad_config: NovedadConfigStore,
    pub archive: ArchiveStore,
    pub units: UnitRegistry,
}

impl TestContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), now)
    }

    pub fn with_store(store: Arc<dyn DocumentStore>, now: DateTime<Utc>) -> Self {
        Self::with_config(store, now, create_test_config())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        now: DateTime<Utc>,
        config: EngineConfig,
    ) -> Self {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::new(now));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        Self {
            engine: RolloverEngine::new(store.clone(), dyn_clock.clone(), config),
            orders: OrderTable::new(store.clone(), dyn_clock.clone(), config),
            ledger: CounterLedger::new(store.clone(), dyn_clock.clone(), config),
            novedades: NovedadRegistry::new(store.clone(), dyn_clock, config),
            novedad_config: NovedadConfigStore::new(store.clone()),
            archive: ArchiveStore::new(store.clone(), config),
            units: UnitRegistry::new(store.clone()),
            store,
            clock,
            config,
        }
    }

    /// Writes the rollover state directly.
    pub fn seed_rollover_state(&self, last: DispatchDate) {
        self.store
            .set(
                SYSTEM,
                ROLLOVER_STATE_KEY,
                serde_json::to_value(RolloverState::at(last)).unwrap(),
                false,
            )
            .unwrap();
    }

    pub fn rollover_state(&self) -> RolloverState {
        self.store
            .get(SYSTEM, ROLLOVER_STATE_KEY)
            .unwrap()
            .map(|d| d.decode().unwrap())
            .unwrap_or_default()
    }
}

/// Failure modes for [`FaultyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Every call fails as if the store were offline.
    Unavailable,
    /// Reads work; every commit is rejected before anything is written.
    RejectCommits,
    /// Commits apply only their first `n` operations, then fail.
    PartialCommits(usize),
    /// Every commit loses to a concurrent writer.
    AlwaysStale,
    /// The next commit loses to a concurrent writer, later ones succeed.
    StaleOnce,
}

/// Wraps a [`MemoryStore`] and injects failures.
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Mutex<Fault>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fault: Mutex::new(Fault::None),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    fn fault(&self) -> Fault {
        *self.fault.lock().unwrap()
    }

    fn offline() -> StoreError {
        StoreError::Unavailable(String::from("injected outage"))
    }
}

impl DocumentStore for FaultyStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        if self.fault() == Fault::Unavailable {
            return Err(Self::offline());
        }
        self.inner.get(collection, key)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        if self.fault() == Fault::Unavailable {
            return Err(Self::offline());
        }
        self.inner.list(collection)
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        match self.fault() {
            Fault::None => self.inner.commit(batch),
            Fault::Unavailable | Fault::RejectCommits => Err(Self::offline()),
            Fault::AlwaysStale => Err(StoreError::PreconditionFailed {
                collection: String::from("system"),
                key: String::from("cierre"),
                expected: Some(1),
                actual: Some(2),
            }),
            Fault::StaleOnce => {
                self.set_fault(Fault::None);
                Err(StoreError::PreconditionFailed {
                    collection: String::from("orders"),
                    key: String::from("taken"),
                    expected: None,
                    actual: Some(1),
                })
            }
            Fault::PartialCommits(applied) => {
                for operation in batch.operations().iter().take(applied) {
                    let mut single: Batch = Batch::new();
                    match operation.clone() {
                        Operation::Set {
                            collection,
                            key,
                            body,
                            merge,
                        } => single.set(&collection, &key, body, merge),
                        Operation::Update {
                            collection,
                            key,
                            fields,
                        } => single.update(&collection, &key, fields),
                        Operation::Delete { collection, key } => single.delete(&collection, &key),
                    };
                    self.inner.commit(single)?;
                }
                Err(StoreError::Database(String::from("injected failure mid-batch")))
            }
        }
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        self.inner.subscribe(filter)
    }

    fn guarantees_atomic_commit(&self) -> bool {
        !matches!(self.fault(), Fault::PartialCommits(_))
    }
}

type Interleaved = Box<dyn FnOnce() + Send>;

/// Wraps a [`MemoryStore`] and runs another client's write once, right
/// before the first commit that writes the rollover state.
///
/// The other client must use the inner store directly.
pub struct InterleavingStore {
    inner: Arc<MemoryStore>,
    before_rollover_commit: Mutex<Option<Interleaved>>,
}

impl InterleavingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            before_rollover_commit: Mutex::new(None),
        }
    }

    pub fn interleave(&self, write: impl FnOnce() + Send + 'static) {
        *self.before_rollover_commit.lock().unwrap() = Some(Box::new(write));
    }

    pub fn interleaved(&self) -> bool {
        self.before_rollover_commit.lock().unwrap().is_none()
    }
}

impl DocumentStore for InterleavingStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, key)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.list(collection)
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        let writes_state: bool = batch.operations().iter().any(|op| {
            matches!(op, Operation::Set { collection, key, .. }
                if collection == SYSTEM && key == ROLLOVER_STATE_KEY)
        });
        if writes_state {
            let pending: Option<Interleaved> = self.before_rollover_commit.lock().unwrap().take();
            if let Some(write) = pending {
                write();
            }
        }
        self.inner.commit(batch)
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        self.inner.subscribe(filter)
    }
}

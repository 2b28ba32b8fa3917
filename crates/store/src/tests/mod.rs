// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod error_tests;
mod store_contract_tests;

use crate::{DocumentStore, MemoryStore, SqliteStore};

/// Returns one fresh instance of every backend.
pub fn create_test_stores() -> Vec<(&'static str, Box<dyn DocumentStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        (
            "sqlite",
            Box::new(SqliteStore::new_in_memory().expect("in-memory sqlite store")),
        ),
    ]
}

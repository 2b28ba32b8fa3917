// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Collection and key names used in the document store.

/// Open orders, keyed by order id.
pub const ORDERS: &str = "orders";
/// Counter buckets, keyed by dispatch date.
pub const COUNTERS: &str = "counters";
/// Per-unit novedad lists, keyed by unit id.
pub const NOVEDADES: &str = "novedades";
/// Global configuration documents.
pub const CONFIG: &str = "config";
/// Key of the novedad configuration inside [`CONFIG`].
pub const NOVEDAD_CONFIG_KEY: &str = "novedades";
/// System singletons.
pub const SYSTEM: &str = "system";
/// Key of the rollover state inside [`SYSTEM`].
pub const ROLLOVER_STATE_KEY: &str = "cierre";
/// Archive snapshots, keyed by dispatch date.
pub const ARCHIVE: &str = "archive";
/// Audit events, keyed by commit time.
pub const AUDIT: &str = "audit";
/// Unit registry, keyed by unit id.
pub const UNITS: &str = "units";

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Optimistic read-modify-write support.

use crate::error::CoreError;
use despacho_store::StoreError;
use tracing::debug;

/// Runs `cycle` until it commits, restarting from a fresh read whenever a
/// batch precondition fails.
///
/// `cycle` must perform its reads, build its batch with revision
/// preconditions, and commit, all on each call.
///
/// # Errors
///
/// Returns the first non-precondition error from `cycle`, or
/// `CoreError::WriteConflict` once `attempts` cycles have all lost.
pub fn with_optimistic_retry<T, F>(
    what: &str,
    attempts: u32,
    mut cycle: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Result<T, CoreError>,
{
    for attempt in 1..=attempts {
        match cycle() {
            Err(CoreError::Store(StoreError::PreconditionFailed {
                collection, key, ..
            })) => {
                debug!(
                    what,
                    attempt,
                    %collection,
                    %key,
                    "Concurrent write detected, retrying"
                );
            }
            other => return other,
        }
    }
    Err(CoreError::WriteConflict {
        target: what.to_string(),
        attempts,
    })
}

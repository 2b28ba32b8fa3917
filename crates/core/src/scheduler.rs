// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Automatic rollover at local midnight.
//!
//! The timer sleeps until the next local midnight, fires once, and then
//! computes the following deadline from the clock again. It never polls.

use crate::error::{CoreError, RolloverError};
use crate::rollover::{RolloverEngine, RolloverOutcome, Trigger};
use chrono::{DateTime, Utc};
use despacho_domain::next_local_midnight;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Delay before retrying when the next deadline cannot be computed.
const DEADLINE_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Runs the check the midnight timer performs when it fires: a status check
/// that bypasses the cache, then a rollover if the day is stale.
///
/// Returns `Ok(None)` when nothing needed closing (including when another
/// client closed the day first).
///
/// # Errors
///
/// Returns any error from the status check or the rollover other than
/// `RolloverError::NotNeeded`.
pub fn run_midnight_check(
    engine: &RolloverEngine,
) -> Result<Option<RolloverOutcome>, CoreError> {
    let trigger: Trigger = Trigger::scheduler(engine.clock().now());
    match engine.execute_due_rollover(&trigger) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(CoreError::Rollover(RolloverError::NotNeeded { .. })) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Deadline timer driving [`run_midnight_check`].
pub struct MidnightScheduler {
    engine: Arc<RolloverEngine>,
}

impl MidnightScheduler {
    #[must_use]
    pub const fn new(engine: Arc<RolloverEngine>) -> Self {
        Self { engine }
    }

    /// Time to sleep until the next local midnight.
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline cannot be resolved in the configured
    /// timezone.
    pub fn time_until_next_midnight(&self) -> Result<Duration, CoreError> {
        let now: DateTime<Utc> = self.engine.clock().now();
        let deadline: DateTime<Utc> = next_local_midnight(now, self.engine.config().timezone)?;
        Ok((deadline - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Runs until `shutdown` changes or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(timezone = %self.engine.config().timezone, "Midnight scheduler started");
        loop {
            let delay: Duration = match self.time_until_next_midnight() {
                Ok(delay) => delay,
                Err(err) => {
                    error!(error = %err, "Cannot compute next midnight; retrying later");
                    DEADLINE_RETRY_DELAY
                }
            };
            debug!(seconds = delay.as_secs(), "Sleeping until next midnight");

            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    match run_midnight_check(&self.engine) {
                        Ok(Some(outcome)) => info!(
                            archive_date = %outcome.archive_date,
                            orders_archived = outcome.orders_archived,
                            "Midnight rollover executed"
                        ),
                        Ok(None) => debug!("Midnight check found the day already open"),
                        Err(err) => error!(error = %err, "Midnight rollover failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Midnight scheduler stopping");
                    break;
                }
            }
        }
    }
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::{DateTime, Duration, Utc};
use despacho_domain::{DispatchDate, Tz};

/// Default lifetime of a cached status check.
pub const DEFAULT_STATUS_CACHE_TTL_MINUTES: i64 = 30;

/// Default width of the prompt window on each side of midnight.
pub const DEFAULT_PROMPT_WINDOW_MINUTES: i64 = 30;

/// Default number of read-verify-commit cycles before giving up.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Zone whose local midnight ends the dispatch day.
    pub timezone: Tz,
    /// How long a non-forced status check may be served from cache.
    pub status_cache_ttl: Duration,
    /// Width of the prompt window before and after midnight.
    pub prompt_window: Duration,
    /// Commit attempts for optimistic read-modify-write cycles.
    pub max_commit_attempts: u32,
}

impl EngineConfig {
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    /// Returns the dispatch date `now` falls on.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> DispatchDate {
        DispatchDate::at(now, self.timezone)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            status_cache_ttl: Duration::minutes(DEFAULT_STATUS_CACHE_TTL_MINUTES),
            prompt_window: Duration::minutes(DEFAULT_PROMPT_WINDOW_MINUTES),
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{TestContext, bogota, create_test_trigger, date};
use crate::RolloverStatus;
use chrono::Duration;

#[test]
fn test_stale_day_needs_rollover() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 0, 10));
    ctx.seed_rollover_state(date(2024, 3, 9));

    let status: RolloverStatus = ctx.engine.check_status(false).unwrap();

    assert!(status.needs_rollover);
    assert!(status.prompt);
    assert_eq!(status.today, date(2024, 3, 10));
    assert_eq!(status.last_rollover_date, Some(date(2024, 3, 9)));
}

#[test]
fn test_prompt_window_does_not_hide_staleness() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    ctx.seed_rollover_state(date(2024, 3, 9));

    let status: RolloverStatus = ctx.engine.check_status(false).unwrap();

    assert!(status.needs_rollover);
    assert!(!status.prompt);
}

#[test]
fn test_never_rolled_over_needs_rollover() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));

    let status: RolloverStatus = ctx.engine.check_status(false).unwrap();

    assert!(status.needs_rollover);
    assert_eq!(status.last_rollover_date, None);
}

#[test]
fn test_open_day_never_prompts() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 0, 5));
    ctx.seed_rollover_state(date(2024, 3, 10));

    let status: RolloverStatus = ctx.engine.check_status(false).unwrap();

    assert!(!status.needs_rollover);
    assert!(!status.prompt);
}

#[test]
fn test_cached_status_is_reused_until_forced() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    ctx.seed_rollover_state(date(2024, 3, 9));
    assert!(ctx.engine.check_status(false).unwrap().needs_rollover);

    // Another client closes the day.
    ctx.seed_rollover_state(date(2024, 3, 10));

    assert!(ctx.engine.check_status(false).unwrap().needs_rollover);
    assert!(!ctx.engine.check_status(true).unwrap().needs_rollover);
}

#[test]
fn test_cached_status_expires_after_ttl() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    ctx.seed_rollover_state(date(2024, 3, 9));
    ctx.engine.check_status(false).unwrap();
    ctx.seed_rollover_state(date(2024, 3, 10));

    ctx.clock
        .advance(ctx.config.status_cache_ttl + Duration::seconds(1));

    assert!(!ctx.engine.check_status(false).unwrap().needs_rollover);
}

#[test]
fn test_cache_is_not_served_across_midnight() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 9, 23, 55));
    ctx.seed_rollover_state(date(2024, 3, 9));
    assert!(!ctx.engine.check_status(false).unwrap().needs_rollover);

    ctx.clock.set(bogota(2024, 3, 10, 0, 1));

    let status: RolloverStatus = ctx.engine.check_status(false).unwrap();
    assert!(status.needs_rollover);
    assert_eq!(status.today, date(2024, 3, 10));
}

#[test]
fn test_clear_status_cache_forces_fresh_read() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 10, 0));
    ctx.seed_rollover_state(date(2024, 3, 9));
    ctx.engine.check_status(false).unwrap();
    ctx.seed_rollover_state(date(2024, 3, 10));

    ctx.engine.clear_status_cache();

    assert!(!ctx.engine.check_status(false).unwrap().needs_rollover);
}

#[test]
fn test_rollover_invalidates_cached_status() {
    let ctx: TestContext = TestContext::new(bogota(2024, 3, 10, 0, 5));
    ctx.seed_rollover_state(date(2024, 3, 9));
    assert!(ctx.engine.check_status(false).unwrap().needs_rollover);

    ctx.engine
        .execute_due_rollover(&create_test_trigger())
        .unwrap();

    assert!(!ctx.engine.check_status(false).unwrap().needs_rollover);
}

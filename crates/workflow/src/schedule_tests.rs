// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn schedule(cron: &str, timezone: Option<&str>) -> ScheduleDef {
    ScheduleDef {
        name: "nightly".to_string(),
        cron: cron.to_string(),
        workflow: "cleanup".to_string(),
        inputs: Map::new(),
        enabled: true,
        timezone: timezone.map(String::from),
    }
}

#[test]
fn normalizes_five_field_expressions() {
    assert_eq!(normalize_cron_expr("*/5 * * * *"), "0 */5 * * * *");
    // Six fields pass through
    assert_eq!(normalize_cron_expr("30 */5 * * * *"), "30 */5 * * * *");
}

#[test]
fn next_fire_advances_strictly() {
    let s = schedule("0 3 * * *", None);
    let after = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();
    let next = s.next_fire(after).unwrap().unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 0).unwrap());
    assert!(next > after);
}

#[test]
fn next_fire_every_minute() {
    let s = schedule("* * * * *", None);
    let after = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 30).unwrap();
    let next = s.next_fire(after).unwrap().unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 12, 1, 0).unwrap());
}

#[test]
fn timezone_shifts_fire_time() {
    // 03:00 in New York is 08:00 UTC during EST (winter)
    let s = schedule("0 3 * * *", Some("America/New_York"));
    let after = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let next = s.next_fire(after).unwrap().unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap());
}

#[test]
fn invalid_expression_is_rejected() {
    let s = schedule("not a cron", None);
    assert!(matches!(
        s.parse_cron().unwrap_err(),
        ScheduleError::InvalidExpr { .. }
    ));
}

#[test]
fn unknown_timezone_is_rejected() {
    let s = schedule("0 3 * * *", Some("Mars/Olympus"));
    assert!(matches!(
        s.tz().unwrap_err(),
        ScheduleError::UnknownTimezone(_)
    ));
}

#[test]
fn enabled_defaults_to_true() {
    let parsed: ScheduleDef =
        serde_yaml::from_str("cron: '0 3 * * *'\nworkflow: cleanup\n").unwrap();
    assert!(parsed.enabled);
}

//! Bucket arithmetic properties.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proptest::prelude::*;
use serde_json::json;

use waypoint_core::{Rate, UnitType};

fn arb_rate() -> impl Strategy<Value = Rate> {
    (1i64..10_000, 1u64..=86_400, 0i64..3).prop_map(|(requests, secs, unit)| {
        Rate::new(requests, Duration::from_secs(secs), UnitType::try_from(unit).unwrap()).unwrap()
    })
}

/// Instants from 1970 to roughly 2100, with sub-second precision.
fn arb_time() -> impl Strategy<Value = SystemTime> {
    (0u64..4_102_444_800, 0u32..1_000_000_000).prop_map(|(s, n)| UNIX_EPOCH + Duration::new(s, n))
}

proptest! {
    #[test]
    fn bucket_contains_t(rate in arb_rate(), t in arb_time()) {
        let cur = rate.current_bucket(t);
        let next = rate.next_bucket(t);
        prop_assert!(cur <= t);
        prop_assert!(t < next);
        prop_assert_eq!(next.duration_since(cur).unwrap(), rate.period());
    }

    #[test]
    fn truncation_is_idempotent(rate in arb_rate(), t in arb_time()) {
        let cur = rate.current_bucket(t);
        prop_assert_eq!(rate.current_bucket(cur), cur);
    }

    #[test]
    fn bucket_start_is_epoch_aligned(rate in arb_rate(), t in arb_time()) {
        let since = rate.current_bucket(t).duration_since(UNIX_EPOCH).unwrap();
        prop_assert_eq!(since.as_nanos() % rate.period().as_nanos(), 0);
    }

    #[test]
    fn retry_is_within_one_period(rate in arb_rate(), t in arb_time()) {
        let retry = rate.retry_seconds(t);
        prop_assert!(retry >= 1);
        prop_assert!(retry as u64 <= rate.period().as_secs());
    }

    #[test]
    fn shorthand_matches_map_form(
        requests in 1i64..1_000_000,
        unit in prop::sample::select(vec!["req", "reqs", "request", "requests", "MB", "Mb"]),
        period in prop::sample::select(vec!["second", "minute", "hour"]),
    ) {
        let short: Rate = format!("{requests} {unit}/{period}").parse().unwrap();
        let map = Rate::from_value(&json!({"requests": requests, "period": period, "unit": unit})).unwrap();
        prop_assert_eq!(short, map);
    }
}

#[test]
fn hundred_per_minute_forms_agree() {
    let a: Rate = "100 req/minute".parse().unwrap();
    let b = Rate::from_value(&json!({"requests": 100, "period": "minute", "unit": "req"})).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.requests(), 100);
    assert_eq!(a.period(), Duration::from_secs(60));
}

#[test]
fn five_per_second_retry_at_boundary() {
    let r: Rate = "5/second".parse().unwrap();
    assert_eq!((r.requests(), r.unit()), (5, UnitType::Requests));
    let boundary = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    assert_eq!(r.retry_seconds(boundary), 1);
}

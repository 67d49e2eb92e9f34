//! Quota rates and time-bucket arithmetic.
//!
//! A `Rate` is "N units per period". Buckets are aligned by truncating epoch
//! time to a multiple of the period, so every replica with a synchronized clock
//! derives the same boundaries without coordination. All functions here are
//! pure and safe to call from any number of threads.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::{self, Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::{Result, WaypointError};
use crate::value::{optional_str, required_integer, required_str, type_name};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Shortest period a rate may use.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);
/// Longest period a rate may use.
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// What a rate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitType {
    #[default]
    Requests,
    Megabits,
    Megabytes,
}

impl UnitType {
    /// Canonical shorthand spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            UnitType::Requests => "requests",
            UnitType::Megabits => "Mb",
            UnitType::Megabytes => "MB",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "req" | "reqs" | "request" | "requests" => Ok(UnitType::Requests),
            "Mb" => Ok(UnitType::Megabits),
            "MB" => Ok(UnitType::Megabytes),
            other => Err(WaypointError::validation(format!("unsupported unit: {other}"))),
        }
    }
}

/// Numeric unit codes as used by older control planes.
impl TryFrom<i64> for UnitType {
    type Error = WaypointError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(UnitType::Requests),
            1 => Ok(UnitType::Megabits),
            2 => Ok(UnitType::Megabytes),
            other => Err(WaypointError::validation(format!("unsupported unit type: {other}"))),
        }
    }
}

/// Map a period word to its duration.
pub fn period_from_str(s: &str) -> Result<Duration> {
    match s {
        "second" => Ok(Duration::from_secs(1)),
        "minute" => Ok(Duration::from_secs(60)),
        "hour" => Ok(Duration::from_secs(60 * 60)),
        other => Err(WaypointError::validation(format!("unsupported period: {other}"))),
    }
}

/// Validated quota specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rate {
    requests: u64,
    period: Duration,
    unit: UnitType,
}

impl Rate {
    /// Build a rate; `requests` must be positive and `period` within
    /// [`MIN_PERIOD`, `MAX_PERIOD`].
    pub fn new(requests: i64, period: Duration, unit: UnitType) -> Result<Self> {
        if requests <= 0 {
            return Err(WaypointError::validation(format!(
                "rate requests should be > 0, got {requests}"
            )));
        }
        if period < MIN_PERIOD || period > MAX_PERIOD {
            return Err(WaypointError::validation(format!(
                "rate period should be within [1 second, 24 hours], got {period:?}"
            )));
        }
        Ok(Self {
            requests: requests as u64,
            period,
            unit,
        })
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn unit(&self) -> UnitType {
        self.unit
    }

    /// Parse either the shorthand string or the structured map form.
    pub fn from_value(v: &Value) -> Result<Self> {
        match v {
            Value::String(s) => s.parse(),
            Value::Object(obj) => Self::from_map(obj),
            other => Err(WaypointError::schema(format!(
                "rate string or dict required, got {}",
                type_name(other)
            ))),
        }
    }

    /// Structured form: `{requests, period, unit?}`.
    pub fn from_map(obj: &Map<String, Value>) -> Result<Self> {
        let requests = required_integer(obj, "requests")?;
        let period = period_from_str(required_str(obj, "period")?)?;
        let unit = match optional_str(obj, "unit")? {
            Some(u) => u.parse()?,
            None => UnitType::Requests,
        };
        Self::new(requests, period, unit)
    }

    /// Start of the bucket containing `t`: epoch time truncated down to a
    /// multiple of the period.
    pub fn current_bucket(&self, t: SystemTime) -> SystemTime {
        let n = epoch_nanos(t);
        let p = self.period.as_nanos() as i128;
        from_epoch_nanos(n - n.rem_euclid(p)).unwrap_or(t)
    }

    /// Start of the bucket after the one containing `t`.
    pub fn next_bucket(&self, t: SystemTime) -> SystemTime {
        let n = epoch_nanos(t) + self.period.as_nanos() as i128;
        match from_epoch_nanos(n) {
            Some(later) => self.current_bucket(later),
            None => t,
        }
    }

    /// Whole seconds from `now` until the next bucket opens.
    pub fn retry_seconds(&self, now: SystemTime) -> i64 {
        unix_seconds(self.next_bucket(now)) - unix_seconds(now)
    }

    /// `requests * period` in seconds.
    ///
    /// Note this is a budget figure scaled by `requests`, not the bucket width.
    pub fn period_seconds(&self) -> i64 {
        let total = self.requests as i128 * self.period.as_nanos() as i128 / NANOS_PER_SEC;
        i64::try_from(total).unwrap_or(i64::MAX)
    }
}

impl FromStr for Rate {
    type Err = WaypointError;

    /// Shorthand form: `<integer> [unit]/<second|minute|hour>`,
    /// e.g. `100 req/minute`, `5/second`, `10 MB/hour`.
    fn from_str(s: &str) -> Result<Self> {
        let bad_format = || WaypointError::parse(format!("unsupported rate format: {s:?}"));

        let (amount, period) = s.trim().split_once('/').ok_or_else(bad_format)?;
        let amount = amount.trim();
        let digits = amount
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(amount.len());
        if digits == 0 {
            return Err(bad_format());
        }

        let requests: i64 = amount[..digits].parse().map_err(|_| {
            WaypointError::parse(format!("rate requests should be an integer in {s:?}"))
        })?;
        let unit = match amount[digits..].trim() {
            "" => UnitType::Requests,
            word => word
                .parse()
                .map_err(|e: WaypointError| WaypointError::parse(format!("{e} in {s:?}")))?,
        };
        let period = period_from_str(period.trim())
            .map_err(|e| WaypointError::parse(format!("{e} in {s:?}")))?;

        Self::new(requests, period, unit)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let period = match self.period.as_secs() {
            1 => "second".to_string(),
            60 => "minute".to_string(),
            3600 => "hour".to_string(),
            _ => format!("{:?}", self.period),
        };
        write!(f, "{} {}/{}", self.requests, self.unit, period)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = Value::deserialize(deserializer)?;
        Rate::from_value(&v).map_err(de::Error::custom)
    }
}

fn epoch_nanos(t: SystemTime) -> i128 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i128,
        Err(e) => -(e.duration().as_nanos() as i128),
    }
}

fn from_epoch_nanos(n: i128) -> Option<SystemTime> {
    let abs = n.unsigned_abs();
    let secs = u64::try_from(abs / NANOS_PER_SEC as u128).ok()?;
    let d = Duration::new(secs, (abs % NANOS_PER_SEC as u128) as u32);
    if n >= 0 {
        UNIX_EPOCH.checked_add(d)
    } else {
        UNIX_EPOCH.checked_sub(d)
    }
}

/// Unix seconds, floored (pre-epoch instants round toward negative infinity).
fn unix_seconds(t: SystemTime) -> i64 {
    let secs = epoch_nanos(t).div_euclid(NANOS_PER_SEC);
    i64::try_from(secs).unwrap_or(if secs < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: u64, nanos: u32) -> SystemTime {
        UNIX_EPOCH + Duration::new(secs, nanos)
    }

    #[test]
    fn shorthand_without_unit_counts_requests() {
        let r: Rate = "5/second".parse().unwrap();
        assert_eq!(r.requests(), 5);
        assert_eq!(r.period(), Duration::from_secs(1));
        assert_eq!(r.unit(), UnitType::Requests);
    }

    #[test]
    fn shorthand_units() {
        assert_eq!("10 MB/hour".parse::<Rate>().unwrap().unit(), UnitType::Megabytes);
        assert_eq!("10 Mb/hour".parse::<Rate>().unwrap().unit(), UnitType::Megabits);
        assert_eq!("10 reqs/minute".parse::<Rate>().unwrap().unit(), UnitType::Requests);
        assert_eq!("10request/minute".parse::<Rate>().unwrap().requests(), 10);
    }

    #[test]
    fn shorthand_and_map_agree() {
        let a: Rate = "100 req/minute".parse().unwrap();
        let b = Rate::from_value(&json!({"requests": 100, "period": "minute", "unit": "req"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shorthand_rejects_garbage() {
        for s in ["", "req/minute", "5 req", "5 req/day", "5 kb/second", "-5/second", "5x/second"] {
            let e = s.parse::<Rate>().unwrap_err();
            assert!(matches!(e, WaypointError::Parse(_)), "input={s:?} err={e}");
        }
        assert!(matches!(
            "0/second".parse::<Rate>().unwrap_err(),
            WaypointError::Validation(_)
        ));
    }

    #[test]
    fn map_form_errors() {
        let e = Rate::from_value(&json!({"requests": 1.5, "period": "second"})).unwrap_err();
        assert!(e.to_string().contains("requests"));
        let e = Rate::from_value(&json!({"requests": 1, "period": "week"})).unwrap_err();
        assert!(e.to_string().contains("week"));
        let e = Rate::from_value(&json!({"requests": 1, "period": "second", "unit": 3})).unwrap_err();
        assert!(matches!(e, WaypointError::Validation(_)));
        let e = Rate::from_value(&json!(5)).unwrap_err();
        assert!(matches!(e, WaypointError::Schema(_)));
    }

    #[test]
    fn constructor_bounds() {
        assert!(Rate::new(0, Duration::from_secs(1), UnitType::Requests).is_err());
        assert!(Rate::new(-3, Duration::from_secs(1), UnitType::Requests).is_err());
        assert!(Rate::new(1, Duration::from_millis(999), UnitType::Requests).is_err());
        assert!(Rate::new(1, MAX_PERIOD + Duration::from_secs(1), UnitType::Requests).is_err());
        assert!(Rate::new(1, MAX_PERIOD, UnitType::Megabits).is_ok());
    }

    // The unit type is a closed enum: every variant is accepted by `Rate::new`,
    // and out-of-range numeric codes are rejected before a rate is built.
    #[test]
    fn unit_type_membership_is_enforced() {
        for unit in [UnitType::Requests, UnitType::Megabits, UnitType::Megabytes] {
            assert!(Rate::new(1, Duration::from_secs(1), unit).is_ok());
        }
        assert_eq!(UnitType::try_from(2).unwrap(), UnitType::Megabytes);
        assert!(matches!(UnitType::try_from(3), Err(WaypointError::Validation(_))));
        assert!(matches!(UnitType::try_from(-1), Err(WaypointError::Validation(_))));
    }

    #[test]
    fn minute_bucket_zeroes_seconds() {
        let r: Rate = "1/minute".parse().unwrap();
        let t = at(1_700_000_123, 456);
        assert_eq!(r.current_bucket(t), at(1_700_000_100, 0));
        assert_eq!(r.next_bucket(t), at(1_700_000_160, 0));
        assert_eq!(r.retry_seconds(t), 37);
    }

    #[test]
    fn retry_at_boundary_is_full_period() {
        let r: Rate = "5/second".parse().unwrap();
        assert_eq!(r.retry_seconds(at(1_700_000_000, 0)), 1);
        let r: Rate = "5/hour".parse().unwrap();
        assert_eq!(r.retry_seconds(at(3600 * 10, 0)), 3600);
    }

    #[test]
    fn pre_epoch_truncates_downward() {
        let r: Rate = "1/minute".parse().unwrap();
        let t = UNIX_EPOCH - Duration::from_secs(30);
        assert_eq!(r.current_bucket(t), UNIX_EPOCH - Duration::from_secs(60));
        assert_eq!(r.next_bucket(t), UNIX_EPOCH);
    }

    #[test]
    fn period_seconds_scales_by_requests() {
        let r: Rate = "10/minute".parse().unwrap();
        assert_eq!(r.period_seconds(), 600);
    }

    #[test]
    fn display_and_deserialize() {
        let r: Rate = "10 MB/hour".parse().unwrap();
        assert_eq!(r.to_string(), "10 MB/hour");
        let from_json: Rate = serde_json::from_value(json!("10 MB/hour")).unwrap();
        assert_eq!(from_json, r);
        assert!(serde_json::from_value::<Rate>(json!(true)).is_err());
    }
}

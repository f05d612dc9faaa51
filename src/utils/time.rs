//! Time source pinned to Africa/Lagos.
//!
//! Every countdown computes "now" in the same zone the server stamps rentals in, regardless of the
//! machine's locale. Lagos observes no DST, so a fixed UTC+01:00 offset is exact.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const LAGOS_UTC_OFFSET_SECS: i32 = 3600;

pub fn lagos() -> FixedOffset {
    FixedOffset::east_opt(LAGOS_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&lagos())
    }
}

/// Wall-clock reading taken once, then advanced by the tokio monotonic clock.
///
/// Wall-clock jumps during a countdown do not affect it, and it follows paused/advanced
/// time under `tokio::time::pause`.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    anchor: DateTime<FixedOffset>,
    started: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn new(anchor: DateTime<FixedOffset>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }

    pub fn from_system() -> Self {
        Self::new(SystemClock.now())
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = self.started.elapsed();
        let elapsed =
            chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor + elapsed
    }
}

/// Clock set by hand; used by fixtures and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A start or expiry reference as the API sends it: epoch number or date-like string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeRef {
    Epoch(i64),
    EpochFloat(f64),
    Text(String),
}

impl TimeRef {
    /// Resolve to an instant; `None` for anything unparseable.
    pub fn parse(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeRef::Epoch(n) => from_epoch(*n),
            TimeRef::EpochFloat(f) if f.is_finite() => from_epoch(f.trunc() as i64),
            TimeRef::EpochFloat(_) => None,
            TimeRef::Text(s) => parse_date_like(s),
        }
    }
}

impl From<&str> for TimeRef {
    fn from(value: &str) -> Self {
        TimeRef::Text(value.to_string())
    }
}

impl From<i64> for TimeRef {
    fn from(value: i64) -> Self {
        TimeRef::Epoch(value)
    }
}

// 超过 10^12 视为毫秒
fn from_epoch(n: i64) -> Option<DateTime<FixedOffset>> {
    let dt = if n.unsigned_abs() > 1_000_000_000_000 {
        DateTime::from_timestamp_millis(n)?
    } else {
        DateTime::from_timestamp(n, 0)?
    };
    Some(dt.with_timezone(&lagos()))
}

/// Parse the date formats seen on the wire. Naive values are Lagos local time.
pub fn parse_date_like(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&lagos()));
    }

    if let Ok(n) = s.parse::<i64>() {
        return from_epoch(n);
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return lagos().from_local_datetime(&naive).single();
        }
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    lagos().from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        parse_date_like(s).unwrap()
    }

    #[test]
    fn test_naive_strings_are_lagos_time() {
        let dt = at("2024-01-01 00:00:00");
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert_eq!(dt.with_timezone(&Utc).to_rfc3339(), "2023-12-31T23:00:00+00:00");
        assert_eq!(at("2024-01-01T00:00:00"), dt);
        assert_eq!(at("2024-01-01"), dt);
    }

    #[test]
    fn test_rfc3339_and_epochs() {
        let expected = at("2024-01-01 01:00:00");
        assert_eq!(at("2024-01-01T00:00:00Z"), expected);
        assert_eq!(at("2024-01-01T00:00:00.000000Z"), expected);
        assert_eq!(TimeRef::Epoch(1_704_067_200).parse(), Some(expected));
        assert_eq!(TimeRef::Epoch(1_704_067_200_000).parse(), Some(expected));
        assert_eq!(TimeRef::EpochFloat(1_704_067_200.7).parse(), Some(expected));
    }

    #[test]
    fn test_malformed_dates_do_not_panic() {
        for bad in ["", "   ", "not a date", "2024-13-45 99:99:99", "yesterday"] {
            assert_eq!(parse_date_like(bad), None, "{bad:?}");
        }
        assert_eq!(TimeRef::EpochFloat(f64::NAN).parse(), None);
    }

    #[test]
    fn test_extreme_epochs_do_not_panic() {
        assert_eq!(TimeRef::Epoch(i64::MIN).parse(), None);
        assert_eq!(TimeRef::Epoch(i64::MAX).parse(), None);
        assert_eq!(TimeRef::EpochFloat(1e300).parse(), None);
        assert_eq!(parse_date_like("-9223372036854775808"), None);
    }

    #[test]
    fn test_time_ref_deserializes_untagged() {
        let refs: Vec<TimeRef> = serde_json::from_str(r#"[1704067200, 1.5, "2024-01-01"]"#).unwrap();
        assert_eq!(refs[0], TimeRef::Epoch(1_704_067_200));
        assert_eq!(refs[1], TimeRef::EpochFloat(1.5));
        assert_eq!(refs[2], TimeRef::Text("2024-01-01".into()));
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(at("2024-01-01 00:00:00"));
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.now(), at("2024-01-01 00:01:30"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchored_clock_follows_tokio_time() {
        let clock = AnchoredClock::new(at("2024-01-01 00:00:00"));
        tokio::time::advance(std::time::Duration::from_secs(5)).await;
        assert_eq!(clock.now(), at("2024-01-01 00:00:05"));
    }
}

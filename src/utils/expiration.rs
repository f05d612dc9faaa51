use chrono::{DateTime, FixedOffset};

use super::time::TimeRef;

/// Which reference governs a rental's remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySource {
    Absolute(DateTime<FixedOffset>),
    Window {
        start: DateTime<FixedOffset>,
        duration_secs: i64,
    },
    Unknown,
}

impl ExpirySource {
    /// An absolute expiry, when parseable, takes precedence over start + duration.
    pub fn resolve(
        start: Option<&TimeRef>,
        duration_secs: Option<i64>,
        expires_at: Option<&TimeRef>,
    ) -> Self {
        if let Some(at) = expires_at.and_then(TimeRef::parse) {
            return ExpirySource::Absolute(at);
        }
        match (start.and_then(TimeRef::parse), duration_secs) {
            (Some(start), Some(duration_secs)) => ExpirySource::Window {
                start,
                duration_secs,
            },
            _ => ExpirySource::Unknown,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            ExpirySource::Absolute(at) => Some(*at),
            ExpirySource::Window {
                start,
                duration_secs,
            } => chrono::TimeDelta::try_seconds(*duration_secs)
                .and_then(|window| start.checked_add_signed(window)),
            ExpirySource::Unknown => None,
        }
    }
}

/// Seconds left at `now`, never negative. No expiration data counts as expired.
pub fn remaining_seconds(source: &ExpirySource, now: DateTime<FixedOffset>) -> i64 {
    match source.deadline() {
        Some(deadline) => (deadline - now).num_seconds().max(0),
        None => 0,
    }
}

pub fn format_remaining(secs: i64) -> String {
    if secs <= 0 {
        return "Expired".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::parse_date_like;

    fn at(s: &str) -> DateTime<FixedOffset> {
        parse_date_like(s).unwrap()
    }

    #[test]
    fn test_fresh_rental_has_full_duration() {
        let now = at("2024-05-05 12:00:00");
        let start = TimeRef::Epoch(now.timestamp());
        for duration in [1, 59, 600, 7200] {
            let source = ExpirySource::resolve(Some(&start), Some(duration), None);
            let remaining = remaining_seconds(&source, now);
            assert!((remaining - duration).abs() <= 1, "{duration} -> {remaining}");
        }
    }

    #[test]
    fn test_past_window_clamps_to_zero() {
        let start = TimeRef::from("2024-01-01 00:00:00");
        let source = ExpirySource::resolve(Some(&start), Some(60), None);
        assert_eq!(remaining_seconds(&source, at("2024-01-01 00:01:01")), 0);
        assert_eq!(remaining_seconds(&source, at("2025-01-01 00:00:00")), 0);
    }

    #[test]
    fn test_malformed_start_means_no_expiration_data() {
        for bad in ["", "garbage", "2024-99-99"] {
            let start = TimeRef::from(bad);
            let source = ExpirySource::resolve(Some(&start), Some(600), None);
            assert_eq!(source, ExpirySource::Unknown);
            assert_eq!(remaining_seconds(&source, at("2024-01-01 00:00:00")), 0);
        }
        assert_eq!(
            ExpirySource::resolve(None, None, None),
            ExpirySource::Unknown
        );
    }

    #[test]
    fn test_out_of_range_duration_counts_as_expired() {
        let now = at("2024-05-05 12:00:00");
        let start = TimeRef::Epoch(now.timestamp());
        for duration in [i64::MAX, i64::MIN, i64::MAX / 1000] {
            let source = ExpirySource::resolve(Some(&start), Some(duration), None);
            assert_eq!(source.deadline(), None, "{duration}");
            assert_eq!(remaining_seconds(&source, now), 0);
        }
    }

    #[test]
    fn test_absolute_expiry_wins() {
        let start = TimeRef::from("2024-01-01 00:00:00");
        let expires = TimeRef::from("2024-01-01 00:02:00");
        let source = ExpirySource::resolve(Some(&start), Some(3600), Some(&expires));
        assert!(matches!(source, ExpirySource::Absolute(_)));
        assert_eq!(remaining_seconds(&source, at("2024-01-01 00:01:00")), 60);
    }

    #[test]
    fn test_unparseable_absolute_falls_back_to_window() {
        let start = TimeRef::from("2024-01-01 00:00:00");
        let expires = TimeRef::from("soon");
        let source = ExpirySource::resolve(Some(&start), Some(600), Some(&expires));
        assert_eq!(remaining_seconds(&source, at("2024-01-01 00:05:00")), 300);
    }

    #[test]
    fn test_ten_minute_rental_scenario() {
        let start = TimeRef::from("2024-01-01 00:00:00");
        let source = ExpirySource::resolve(Some(&start), Some(600), None);

        let remaining = remaining_seconds(&source, at("2024-01-01 00:09:00"));
        assert_eq!(remaining, 60);
        assert_eq!(format_remaining(remaining), "1m 0s");

        let remaining = remaining_seconds(&source, at("2024-01-01 00:10:01"));
        assert_eq!(remaining, 0);
        assert_eq!(format_remaining(remaining), "Expired");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(-5), "Expired");
        assert_eq!(format_remaining(7), "0m 7s");
        assert_eq!(format_remaining(3599), "59m 59s");
        assert_eq!(format_remaining(3661), "1h 1m 1s");
    }
}

//! Relative publication times

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Render a publication time relative to `now`
///
/// Text that is already relative ("3 hours ago") and text that is not a
/// recognizable timestamp are returned unchanged.
pub fn format_time_ago(raw: &str, now: DateTime<Utc>) -> String {
    if raw.contains("ago") || raw.contains("hour") || raw.contains("minute") {
        return raw.to_string();
    }

    let Some(published) = parse_timestamp(raw.trim()) else {
        return raw.to_string();
    };

    let elapsed = now.signed_duration_since(published);
    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes();

    if hours > 0 {
        plural(hours, "hour")
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        "Just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_text_passes_through() {
        assert_eq!(format_time_ago("3 hours ago", now()), "3 hours ago");
        assert_eq!(format_time_ago("about an hour", now()), "about an hour");
        assert_eq!(format_time_ago("5 minutes", now()), "5 minutes");
    }

    #[test]
    fn test_rfc3339() {
        let published = (now() - Duration::minutes(90)).to_rfc3339();
        assert_eq!(format_time_ago(&published, now()), "1 hour ago");

        let published = (now() - Duration::hours(5)).to_rfc3339();
        assert_eq!(format_time_ago(&published, now()), "5 hours ago");

        assert_eq!(
            format_time_ago("2024-03-10T13:00:00+02:00", now()),
            "1 hour ago"
        );
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        assert_eq!(format_time_ago("2024-03-10T11:59:00", now()), "1 minute ago");
        assert_eq!(format_time_ago("2024-03-10 11:30:00", now()), "30 minutes ago");
        assert_eq!(format_time_ago("2024-03-10T11:59:59.500", now()), "Just now");
        assert_eq!(format_time_ago("2024-03-09", now()), "36 hours ago");
    }

    #[test]
    fn test_future_is_just_now() {
        assert_eq!(format_time_ago("2024-03-10T12:30:00Z", now()), "Just now");
    }

    #[test]
    fn test_unparseable_is_unchanged() {
        assert_eq!(format_time_ago("yesterday", now()), "yesterday");
        assert_eq!(format_time_ago("", now()), "");
    }
}

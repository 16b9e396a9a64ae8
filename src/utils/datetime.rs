/// Format a unix timestamp (seconds) relative to `now`: "2d ago", "3h ago",
/// "15m ago", or "just now". Zero means the source gave no date.
pub fn format_relative(timestamp: i64, now: i64) -> String {
    if timestamp <= 0 {
        return "unknown".to_string();
    }

    // If timestamp is in the future, show just now
    if now <= timestamp {
        return "just now".to_string();
    }

    let delta = now - timestamp;
    let days = delta / 86_400;
    if days > 0 {
        return format!("{}d ago", days);
    }

    let hours = delta / 3_600;
    if hours > 0 {
        return format!("{}h ago", hours);
    }

    let minutes = delta / 60;
    if minutes > 0 {
        return format!("{}m ago", minutes);
    }

    "just now".to_string()
}

/// Calendar date (`YYYY-MM-DD`, UTC) for detail views.
pub fn format_date(timestamp: i64) -> Option<String> {
    if timestamp <= 0 {
        return None;
    }
    jiff::Timestamp::from_second(timestamp)
        .ok()
        .map(|ts| ts.strftime("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn returns_just_now_for_current_and_future() {
        assert_eq!(format_relative(NOW, NOW), "just now");
        assert_eq!(format_relative(NOW + 10, NOW), "just now");
        assert_eq!(format_relative(NOW - 30, NOW), "just now");
    }

    #[test]
    fn returns_minutes_hours_and_days() {
        assert_eq!(format_relative(NOW - 5 * 60, NOW), "5m ago");
        assert_eq!(format_relative(NOW - 2 * 3_600, NOW), "2h ago");
        assert_eq!(format_relative(NOW - 23 * 3_600 - 59, NOW), "23h ago");
        assert_eq!(format_relative(NOW - 3 * 86_400, NOW), "3d ago");
    }

    #[test]
    fn missing_date_is_unknown() {
        assert_eq!(format_relative(0, NOW), "unknown");
        assert_eq!(format_date(0), None);
    }

    #[test]
    fn formats_calendar_date() {
        assert_eq!(format_date(1_714_564_800).as_deref(), Some("2024-05-01"));
    }
}

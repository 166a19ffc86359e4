//! Formatting helpers for report headers and exports.

use crate::history::TimeWindow;
use chrono::{DateTime, FixedOffset};

/// Format a Unix timestamp in `offset` as `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(ts: i64, offset: FixedOffset) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}

/// Format a window as `start ~ end`, dropping the end date when it matches.
pub fn format_window(window: TimeWindow, offset: FixedOffset) -> String {
    let start = format_timestamp(window.start, offset);
    let end = format_timestamp(window.end, offset);
    match (start.split_once(' '), end.split_once(' ')) {
        (Some((start_date, _)), Some((end_date, end_time))) if start_date == end_date => {
            format!("{start} ~ {end_time}")
        }
        _ => format!("{start} ~ {end}"),
    }
}

/// Format a minute count compactly (e.g., "90m" as "1h 30m").
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Header lines printed above a report.
pub fn header_lines(
    group_id: &str,
    window: TimeWindow,
    offset: FixedOffset,
    duration_minutes: u32,
    messages: usize,
    senders: usize,
) -> Vec<String> {
    vec![
        format!("Group {group_id}"),
        format!(
            "{} ({})",
            format_window(window, offset),
            format_minutes(duration_minutes)
        ),
        format!("{messages} messages from {senders} members"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-01 00:00 UTC
        assert_eq!(format_timestamp(1_704_067_200, utc8()), "2024-01-01 08:00");
    }

    #[test]
    fn test_format_window_same_day() {
        let window = TimeWindow::ending_at(1_704_067_200 + 3600, 60);
        assert_eq!(format_window(window, utc8()), "2024-01-01 08:00 ~ 09:00");
    }

    #[test]
    fn test_format_window_across_days() {
        let window = TimeWindow::ending_at(1_704_067_200, 1440);
        assert_eq!(
            format_window(window, utc8()),
            "2023-12-31 08:00 ~ 2024-01-01 08:00"
        );
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(1440), "24h");
        assert_eq!(format_minutes(90), "1h 30m");
    }
}

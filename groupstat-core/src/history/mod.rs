//! Chat-history windowing
//!
//! The host only serves "the most recent N messages". To get every message
//! in `[start, end]` we ask for a page, and while its oldest message is
//! still newer than `start` we ask again for a bigger page. Once the page
//! reaches back far enough, two binary searches cut out the window.
//!
//! Growth stops in three ways:
//! - the page reaches `start`: the window is complete
//! - the host returns fewer messages than asked: it has no older history,
//!   the window is returned as is
//! - the next page would exceed `max_count`: [`Error::WindowTooLarge`]

use crate::config::HistoryConfig;
use crate::error::{Error, Result};
use crate::types::Event;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

/// A paginated chat-history API.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// The most recent `count` messages of a group, ascending by timestamp.
    async fn get_history(&self, group_id: &str, count: usize) -> Result<Vec<Event>>;
}

/// Inclusive range of Unix timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// The `minutes` leading up to and including `end`.
    pub fn ending_at(end: i64, minutes: u32) -> Self {
        Self {
            start: end - minutes as i64 * 60,
            end,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Page growth settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// First page size, and how much each retry adds
    pub page_step: usize,
    /// Largest page ever requested
    pub max_count: usize,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        HistoryConfig::default().into()
    }
}

impl From<HistoryConfig> for WindowPolicy {
    fn from(config: HistoryConfig) -> Self {
        Self {
            page_step: config.page_step,
            max_count: config.max_count,
        }
    }
}

/// Fetch every message of `group_id` inside `window`, ascending.
///
/// History API errors are returned as they are; only short coverage is
/// retried.
pub async fn fetch_window(
    source: &dyn HistorySource,
    group_id: &str,
    window: TimeWindow,
    policy: WindowPolicy,
) -> Result<Vec<Event>> {
    let mut count = policy.page_step.max(1);

    loop {
        let page = source.get_history(group_id, count).await?;
        let oldest = match page.first() {
            Some(event) => event.timestamp,
            None => {
                tracing::info!(group_id, "Group has no history");
                return Ok(Vec::new());
            }
        };

        if oldest <= window.start {
            let events = slice_window(&page, window).to_vec();
            tracing::debug!(group_id, count, events = events.len(), "History window fetched");
            return Ok(events);
        }

        if page.len() < count {
            let events = slice_window(&page, window).to_vec();
            tracing::info!(
                group_id,
                count,
                events = events.len(),
                oldest,
                window_start = window.start,
                "History ends inside the window, returning partial window"
            );
            return Ok(events);
        }

        let next = count + policy.page_step.max(1);
        if next > policy.max_count {
            tracing::warn!(group_id, count, max_count = policy.max_count, "History page ceiling reached");
            return Err(Error::WindowTooLarge { requested: next });
        }
        tracing::debug!(group_id, count, next, oldest, "Page too short, growing");
        count = next;
    }
}

/// The part of an ascending `events` slice inside `window`.
pub fn slice_window(events: &[Event], window: TimeWindow) -> &[Event] {
    let lower = events.partition_point(|e| e.timestamp < window.start);
    let upper = events.partition_point(|e| e.timestamp <= window.end);
    if lower >= upper {
        return &[];
    }
    &events[lower..upper]
}

/// Parse an `HH:MM` time of day.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    let trimmed = input.trim();
    let well_formed = trimmed.len() == 5
        && trimmed.as_bytes()[2] == b':'
        && trimmed
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !well_formed {
        return Err(Error::InvalidTime(input.to_string()));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M").map_err(|_| Error::InvalidTime(input.to_string()))
}

/// Unix timestamp of the latest `time` (in `offset`) at or before `now`.
pub fn resolve_end_timestamp(now: DateTime<Utc>, time: NaiveTime, offset: FixedOffset) -> i64 {
    let local_now = now.with_timezone(&offset).naive_local();
    let mut end = local_now.date().and_time(time);
    if end > local_now {
        end -= chrono::Duration::days(1);
    }
    end.and_utc().timestamp() - offset.local_minus_utc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Serves the tail of a fixed history and records requested counts.
    struct FixedHistory {
        events: Vec<Event>,
        requests: Mutex<Vec<usize>>,
    }

    impl FixedHistory {
        /// `len` events one minute apart, the last at `end`.
        fn minutely(len: usize, end: i64) -> Self {
            let events = (0..len)
                .map(|i| {
                    let ts = end - (len - 1 - i) as i64 * 60;
                    Event::text(format!("u{}", i % 7), ts, format!("message {i}"))
                })
                .collect();
            Self {
                events,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<usize> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistorySource for FixedHistory {
        async fn get_history(&self, _group_id: &str, count: usize) -> Result<Vec<Event>> {
            self.requests.lock().unwrap().push(count);
            let skip = self.events.len().saturating_sub(count);
            Ok(self.events[skip..].to_vec())
        }
    }

    /// Always returns a full page of messages a second apart ending now.
    struct EndlessHistory {
        end: i64,
    }

    #[async_trait]
    impl HistorySource for EndlessHistory {
        async fn get_history(&self, _group_id: &str, count: usize) -> Result<Vec<Event>> {
            Ok((0..count)
                .map(|i| Event::text("u", self.end - (count - 1 - i) as i64, "spam"))
                .collect())
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistorySource for BrokenHistory {
        async fn get_history(&self, _group_id: &str, _count: usize) -> Result<Vec<Event>> {
            Err(Error::History("retcode 1400".to_string()))
        }
    }

    const T: i64 = 1_700_000_000;

    #[tokio::test]
    async fn test_window_inside_first_page() {
        let source = FixedHistory::minutely(500, T);
        let events = fetch_window(
            &source,
            "g1",
            TimeWindow::ending_at(T, 60),
            WindowPolicy::default(),
        )
        .await
        .unwrap();

        // inclusive bounds: T-3600 through T, one message per minute
        assert_eq!(events.len(), 61);
        assert_eq!(events.first().unwrap().timestamp, T - 3600);
        assert_eq!(events.last().unwrap().timestamp, T);
        assert!(events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(source.requests(), vec![101]);
    }

    #[tokio::test]
    async fn test_page_grows_until_window_is_covered() {
        let source = FixedHistory::minutely(1000, T);
        let events = fetch_window(
            &source,
            "g1",
            TimeWindow::ending_at(T, 250),
            WindowPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(events.len(), 251);
        assert_eq!(source.requests(), vec![101, 202, 303]);
    }

    #[tokio::test]
    async fn test_short_history_returns_partial_window() {
        let source = FixedHistory::minutely(150, T);
        let events = fetch_window(
            &source,
            "g1",
            TimeWindow::ending_at(T, 1440),
            WindowPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(events.len(), 150);
        assert_eq!(source.requests(), vec![101, 202]);
    }

    #[tokio::test]
    async fn test_growth_ceiling_is_an_error() {
        let source = EndlessHistory { end: T };
        let err = fetch_window(
            &source,
            "g1",
            TimeWindow::ending_at(T, 1440),
            WindowPolicy {
                page_step: 100,
                max_count: 300,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::WindowTooLarge { requested: 400 }));
    }

    #[tokio::test]
    async fn test_history_errors_propagate() {
        let err = fetch_window(
            &BrokenHistory,
            "g1",
            TimeWindow::ending_at(T, 60),
            WindowPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::History(_)));
    }

    #[tokio::test]
    async fn test_empty_history() {
        let source = FixedHistory::minutely(0, T);
        let events = fetch_window(
            &source,
            "g1",
            TimeWindow::ending_at(T, 60),
            WindowPolicy::default(),
        )
        .await
        .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_slice_window_bounds() {
        let events: Vec<Event> = [10, 20, 20, 30, 40]
            .iter()
            .map(|ts| Event::text("u", *ts, "x"))
            .collect();

        let slice = slice_window(&events, TimeWindow { start: 20, end: 30 });
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].timestamp, 20);

        assert!(slice_window(&events, TimeWindow { start: 41, end: 50 }).is_empty());
        assert!(slice_window(&events, TimeWindow { start: 21, end: 29 }).is_empty());
        assert!(slice_window(&[], TimeWindow { start: 0, end: 50 }).is_empty());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("23:00").unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day(" 07:30 ").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        for bad in ["24:00", "7:30", "12:60", "noon", "12-30", "", "12:30:00"] {
            assert!(
                matches!(parse_time_of_day(bad), Err(Error::InvalidTime(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_end_timestamp() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let eleven_pm = NaiveTime::from_hms_opt(23, 0, 0).unwrap();

        // 2024-03-10 23:30 at +08:00: today's 23:00 already passed
        let now = offset
            .with_ymd_and_hms(2024, 3, 10, 23, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        let expected = offset.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        assert_eq!(resolve_end_timestamp(now, eleven_pm, offset), expected.timestamp());

        // 2024-03-10 09:00 at +08:00: falls back to yesterday
        let now = offset
            .with_ymd_and_hms(2024, 3, 10, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let expected = offset.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
        assert_eq!(resolve_end_timestamp(now, eleven_pm, offset), expected.timestamp());

        // exactly on time counts as now
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(resolve_end_timestamp(now, eleven_pm, utc), now.timestamp());
    }
}

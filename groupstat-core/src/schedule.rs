//! Scheduled reports for subscribed groups.
//!
//! At every configured time of day, one report task per subscribed group is
//! started and all of them are awaited together. A group whose report fails
//! gets the failure as a text message; the other groups are unaffected.

use crate::error::{Error, Result};
use crate::history::parse_time_of_day;
use crate::service::ReportService;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use futures::future::join_all;

/// Delivers report output to a group.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_text(&self, group_id: &str, text: &str) -> Result<()>;

    /// Send one encoded PNG.
    async fn notify_image(&self, group_id: &str, png: &[u8]) -> Result<()>;
}

/// Result of one group's scheduled report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group_id: String,
    /// Frames delivered, or the failure text sent to the group
    pub result: std::result::Result<usize, String>,
}

impl GroupOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// The first configured time of day strictly after `now`, with the time it matched.
///
/// Returns `None` when `times` is empty.
pub fn next_run_after(
    now: DateTime<Utc>,
    times: &[NaiveTime],
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, NaiveTime)> {
    let local_now = now.with_timezone(&offset).naive_local();
    times
        .iter()
        .map(|time| {
            let mut at = local_now.date().and_time(*time);
            if at <= local_now {
                at += Duration::days(1);
            }
            let utc = DateTime::from_timestamp(
                at.and_utc().timestamp() - offset.local_minus_utc() as i64,
                0,
            );
            (utc, *time)
        })
        .filter_map(|(utc, time)| utc.map(|u| (u, time)))
        .min_by_key(|(at, _)| *at)
}

/// Run the report ending at `time_of_day` for every subscribed group.
pub async fn run_subscribed(
    service: &ReportService,
    notifier: &dyn Notifier,
    time_of_day: &str,
) -> Vec<GroupOutcome> {
    let groups = service.subscribed_groups();
    let duration = service.config().analysis.duration_minutes;
    tracing::info!(groups = groups.len(), time_of_day, "Running scheduled reports");

    let tasks = groups
        .iter()
        .map(|group_id| run_group(service, notifier, group_id, time_of_day, duration));
    let outcomes = join_all(tasks).await;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(groups = outcomes.len(), failed, "Scheduled reports finished");
    outcomes
}

async fn run_group(
    service: &ReportService,
    notifier: &dyn Notifier,
    group_id: &str,
    time_of_day: &str,
    duration: u32,
) -> GroupOutcome {
    let result = match service.run(group_id, time_of_day, duration).await {
        Ok(report) => deliver(notifier, group_id, &report.frames).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(frames) => GroupOutcome {
            group_id: group_id.to_string(),
            result: Ok(frames),
        },
        Err(e) => {
            if e.is_insufficient_data() {
                tracing::info!(group_id, error = %e, "Scheduled report skipped");
            } else {
                tracing::error!(group_id, error = %e, "Scheduled report failed");
            }
            let message = e.user_message();
            if let Err(notify_err) = notifier.notify_text(group_id, &message).await {
                tracing::warn!(group_id, error = %notify_err, "Could not notify group of failure");
            }
            GroupOutcome {
                group_id: group_id.to_string(),
                result: Err(message),
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, group_id: &str, frames: &[Vec<u8>]) -> Result<usize> {
    for frame in frames {
        notifier.notify_image(group_id, frame).await?;
    }
    Ok(frames.len())
}

/// Run scheduled reports forever.
///
/// Returns only if the configuration has no usable analysis times.
pub async fn run_daemon(service: &ReportService, notifier: &dyn Notifier) -> Result<()> {
    loop {
        let config = service.config();
        let offset = config.analysis.utc_offset()?;
        let times = config
            .analysis
            .times
            .iter()
            .map(|t| parse_time_of_day(t))
            .collect::<Result<Vec<_>>>()?;

        let now = Utc::now();
        let (at, time) = next_run_after(now, &times, offset)
            .ok_or_else(|| Error::Config("analysis.times is empty".to_string()))?;
        let wait = (at - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %at, wait_secs = wait.as_secs(), "Waiting for next report");

        tokio::time::sleep(wait).await;
        run_subscribed(service, notifier, &time.format("%H:%M").to_string()).await;
    }
}

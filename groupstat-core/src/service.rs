//! Report service: from "report on group G at HH:MM" to rendered frames.
//!
//! ```text
//! parse HH:MM ──► resolve end ──► fetch window ──► enough messages?
//!                                                      │
//!                    RenderedReport ◄── analyze ◄── build engine
//! ```
//!
//! The time of day is validated before any I/O.

use crate::analytics::{AnalysisEngine, EngineSetup, RenderedReport, ReportMeta};
use crate::avatar::HttpAvatarSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::header_lines;
use crate::history::{fetch_window, parse_time_of_day, resolve_end_timestamp, HistorySource, TimeWindow};
use crate::onebot::OneBotClient;
use crate::render::{resolve_font, BlockChartRenderer, ScratchDir, StackedReportRenderer};
use crate::segment::JiebaSegmenter;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Runs reports and keeps subscription bookkeeping.
pub struct ReportService {
    config: RwLock<Config>,
    /// Where subscription changes are persisted, if anywhere
    config_path: Option<PathBuf>,
    history: Arc<dyn HistorySource>,
    setup: EngineSetup,
}

impl ReportService {
    pub fn new(config: Config, history: Arc<dyn HistorySource>, setup: EngineSetup) -> Self {
        Self {
            config: RwLock::new(config),
            config_path: None,
            history,
            setup,
        }
    }

    /// Persist subscription changes to `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Wire up the built-in collaborators against a OneBot host.
    ///
    /// Returns the client too, for use as the notifier.
    pub fn connect(config: Config) -> Result<(Self, Arc<OneBotClient>)> {
        let client = Arc::new(OneBotClient::new(&config.onebot)?);
        let scratch_dir = config.report.scratch_dir();
        std::fs::create_dir_all(&scratch_dir)?;

        let font = resolve_font(config.report.font_path.as_deref())?;

        let setup = EngineSetup {
            scratch: ScratchDir::new(scratch_dir),
            segmenter: Arc::new(JiebaSegmenter::new()),
            charts: Arc::new(BlockChartRenderer::new(font.clone())),
            renderer: Arc::new(StackedReportRenderer::new(font)),
            directory: client.clone(),
            avatars: Arc::new(HttpAvatarSource::new(&config.avatar)?),
            utc_offset_secs: config.analysis.utc_offset()?.local_minus_utc(),
            ranking_depth: config.analysis.ranking_depth,
            render_retries: config.analysis.render_retries,
        };

        let service = Self::new(config, client.clone(), setup);
        Ok((service, client))
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.config.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.read().clone()
    }

    /// Report on `group_id` for the `duration_minutes` up to the latest `time_of_day`.
    pub async fn run(
        &self,
        group_id: &str,
        time_of_day: &str,
        duration_minutes: u32,
    ) -> Result<RenderedReport> {
        self.run_at(Utc::now(), group_id, time_of_day, duration_minutes)
            .await
    }

    /// [`run`](Self::run) with an explicit clock.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        group_id: &str,
        time_of_day: &str,
        duration_minutes: u32,
    ) -> Result<RenderedReport> {
        let time = parse_time_of_day(time_of_day)?;
        let config = self.config();
        let offset = config.analysis.utc_offset()?;
        let window = TimeWindow::ending_at(resolve_end_timestamp(now, time, offset), duration_minutes);

        tracing::info!(
            group_id,
            time_of_day,
            duration_minutes,
            window_start = window.start,
            window_end = window.end,
            "Starting report"
        );

        let events = fetch_window(
            self.history.as_ref(),
            group_id,
            window,
            config.history.clone().into(),
        )
        .await?;

        let required = config.analysis.minimum_message_count;
        if events.len() < required {
            tracing::info!(group_id, found = events.len(), required, "Not enough messages");
            return Err(Error::InsufficientData {
                found: events.len(),
                required,
            });
        }

        let senders: HashSet<&str> = events.iter().map(|e| e.sender_id.as_str()).collect();
        let meta = ReportMeta {
            title: config.report.title.clone(),
            header: header_lines(
                group_id,
                window,
                offset,
                duration_minutes,
                events.len(),
                senders.len(),
            ),
        };

        let mut engine = AnalysisEngine::new(group_id, meta, self.setup.clone());
        engine.analyze(&events).await
    }

    pub fn is_subscribed(&self, group_id: &str) -> bool {
        self.read().analysis.is_subscribed(group_id)
    }

    pub fn subscribed_groups(&self) -> Vec<String> {
        self.read().analysis.subscribed_groups.clone()
    }

    /// Add a group to automatic reports. Returns false if it already was.
    pub fn subscribe(&self, group_id: &str) -> Result<bool> {
        let mut config = self.write();
        let changed = config.analysis.subscribe(group_id);
        if changed {
            self.persist(&config)?;
            tracing::info!(group_id, "Group subscribed");
        }
        Ok(changed)
    }

    /// Remove a group from automatic reports. Returns false if it wasn't there.
    pub fn unsubscribe(&self, group_id: &str) -> Result<bool> {
        let mut config = self.write();
        let changed = config.analysis.unsubscribe(group_id);
        if changed {
            self.persist(&config)?;
            tracing::info!(group_id, "Group unsubscribed");
        }
        Ok(changed)
    }

    fn persist(&self, config: &Config) -> Result<()> {
        match &self.config_path {
            Some(path) => config.save_to(path),
            None => Ok(()),
        }
    }
}

/// Save report frames as `<group>-<stamp>[-<n>].png` under `dir`.
pub fn write_frames(report: &RenderedReport, dir: &Path, stamp: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let base = format!("{}-{}", report.group_id, stamp.format("%Y%m%d-%H%M%S"));

    let mut paths = Vec::with_capacity(report.frames.len());
    for (i, frame) in report.frames.iter().enumerate() {
        let name = if report.frames.len() == 1 {
            format!("{base}.png")
        } else {
            format!("{base}-{}.png", i + 1)
        };
        let path = dir.join(name);
        std::fs::write(&path, frame)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{AvatarSource, MemberDirectory};
    use crate::render::text::bundled_font;
    use crate::render::{Report, ReportRenderer};
    use crate::types::Event;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Minutely {
        end: i64,
        len: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HistorySource for Minutely {
        async fn get_history(&self, _group_id: &str, count: usize) -> Result<Vec<Event>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = count.min(self.len);
            Ok((0..n)
                .map(|i| {
                    let ts = self.end - (n - 1 - i) as i64 * 60;
                    Event::text(format!("u{}", i % 3), ts, "hello there")
                })
                .collect())
        }
    }

    struct Names;

    #[async_trait]
    impl MemberDirectory for Names {
        async fn display_name(&self, _group_id: &str, user_id: &str) -> Result<String> {
            Ok(user_id.to_uppercase())
        }
    }

    struct NoAvatars;

    #[async_trait]
    impl AvatarSource for NoAvatars {
        async fn get_avatar(&self, _user_id: &str) -> Result<Vec<u8>> {
            Err(Error::Avatar("offline".to_string()))
        }
    }

    struct OneFrame;

    #[async_trait]
    impl ReportRenderer for OneFrame {
        async fn render(&self, report: &Report) -> Result<Vec<Vec<u8>>> {
            Ok(vec![report.title.as_bytes().to_vec()])
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap()
    }

    fn service(dir: &Path, len: usize) -> (ReportService, Arc<Minutely>) {
        crate::logging::init_test();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap().timestamp();
        let history = Arc::new(Minutely {
            end,
            len,
            calls: AtomicUsize::new(0),
        });
        let setup = EngineSetup {
            scratch: ScratchDir::new(dir),
            segmenter: Arc::new(JiebaSegmenter::new()),
            charts: Arc::new(BlockChartRenderer::new(bundled_font().unwrap())),
            renderer: Arc::new(OneFrame),
            directory: Arc::new(Names),
            avatars: Arc::new(NoAvatars),
            utc_offset_secs: 0,
            ranking_depth: 3,
            render_retries: 3,
        };
        let mut config = Config::default();
        config.analysis.minimum_message_count = 50;
        (ReportService::new(config, history.clone(), setup), history)
    }

    #[tokio::test]
    async fn test_run_produces_report() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path(), 500);

        let report = service.run_at(now(), "g1", "23:00", 120).await.unwrap();
        assert_eq!(report.frames, vec![b"Daily Group Chat Summary".to_vec()]);
        assert_eq!(report.meta.header[0], "Group g1");
        assert_eq!(report.meta.header[2], "121 messages from 3 members");
        assert_eq!(report.tallies[0].name, "Chatterbox");
        let total: u64 = report.tallies[0].entries.iter().map(|(_, v)| v).sum();
        assert_eq!(total, 121);
    }

    #[tokio::test]
    async fn test_bad_time_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let (service, history) = service(dir.path(), 500);

        let err = service.run_at(now(), "g1", "25:00", 60).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTime(_)));
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_minimum_message_count_guard() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path(), 10);

        let err = service.run_at(now(), "g1", "23:00", 60).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                found: 10,
                required: 50
            }
        ));
    }

    #[test]
    fn test_subscriptions_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let (service, _) = service(dir.path(), 0);
        let service = service.with_config_path(&path);

        assert!(service.subscribe("100").unwrap());
        assert!(!service.subscribe("100").unwrap());
        assert!(service.is_subscribed("100"));

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.analysis.subscribed_groups, vec!["100".to_string()]);

        assert!(service.unsubscribe("100").unwrap());
        assert!(!service.unsubscribe("100").unwrap());
        assert!(service.subscribed_groups().is_empty());
    }

    #[test]
    fn test_write_frames() {
        let dir = tempfile::tempdir().unwrap();
        let report = RenderedReport {
            group_id: "g1".to_string(),
            meta: ReportMeta::default(),
            frames: vec![vec![1], vec![2]],
            tallies: vec![],
        };
        let paths = write_frames(&report, dir.path(), now()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("g1-20240501-233000-1.png"));
        assert_eq!(std::fs::read(&paths[1]).unwrap(), vec![2]);
    }
}

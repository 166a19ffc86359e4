//! Analyzer framework and analysis engine
//!
//! Analyzers are small stateful counters. The engine owns one instance of
//! every registered analyzer, feeds them all from a single pass over the
//! event window, then hands their results to the report renderer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ANALYSIS ENGINE                           │
//! │                                                                 │
//! │  events ──► reset all ──► for each event:                       │
//! │                             for each analyzer (registry order): │
//! │                               process_event(event)              │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐              │
//! │  │ Ranking     │  │ Ranking     │  │ Artifact    │  ...         │
//! │  │ (senders)   │  │ (images)    │  │ (hourly)    │              │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘              │
//! │         ▼ enrich         ▼ enrich         ▼ scratch PNG         │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │ Report ──► ReportRenderer::render() ──► frames           │   │
//! │  │ (no frames: rerun the whole pipeline, bounded)           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use groupstat_core::analytics::{AnalysisEngine, ReportMeta};
//!
//! let mut engine = AnalysisEngine::new("123456", meta, setup);
//! let report = engine.analyze(&events).await?;
//! std::fs::write("report.png", &report.frames[0])?;
//! ```

use super::registry::{self, AnalyzerRegistry};
use crate::enrich::{AvatarSource, Enricher, MemberDirectory};
use crate::error::{Error, Result};
use crate::render::{
    ArtifactHandle, ChartRenderer, Report, ReportRenderer, ScratchDir, Section, SectionContent,
};
use crate::segment::{MemoSegmenter, Segmenter};
use crate::types::Event;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

// ============================================
// Analyzer context and outputs
// ============================================

/// What an analyzer is bound to when it is built.
#[derive(Clone)]
pub struct AnalyzerContext {
    pub group_id: String,
    /// Offset applied before bucketing timestamps by hour
    pub utc_offset_secs: i32,
    /// Word segmentation shared by the language analyzers
    pub segmenter: Arc<dyn Segmenter>,
}

/// One frequency-map entry with its position in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub subject: String,
    /// 1-based
    pub rank: usize,
    pub value: u64,
}

/// Number already-ranked entries from 1.
pub fn rank(entries: Vec<(String, u64)>) -> Vec<RankedCount> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (subject, value))| RankedCount {
            subject,
            rank: i + 1,
            value,
        })
        .collect()
}

/// Result of one analyzer after the pass.
#[derive(Debug, Clone)]
pub enum AnalyzerOutput {
    /// Users ordered by descending value, encounter order on ties
    Ranking(Vec<RankedCount>),
    /// Chart drawn from the frequency map and parked in scratch storage
    Artifact(ArtifactHandle),
}

/// Where artifact-producing analyzers draw and store their charts.
pub struct ArtifactSink<'a> {
    pub charts: &'a dyn ChartRenderer,
    pub scratch: &'a ScratchDir,
}

// ============================================
// Analyzer trait
// ============================================

/// A stateful counter fed one event at a time.
///
/// Implementations must be deterministic: after `reset()`, the same event
/// sequence always produces the same tally. `process_event` never fails; an
/// event with nothing to count is a no-op.
pub trait Analyzer: Send + Sync {
    /// Display name, used as the report section title.
    fn name(&self) -> &str;

    /// Label for the counted quantity (e.g. "messages").
    fn unit(&self) -> &str;

    /// Clear all accumulated state, including anything beyond the frequency map.
    fn reset(&mut self);

    fn process_event(&mut self, event: &Event);

    /// Frequency map entries, descending by value, encounter order on ties.
    fn tally(&self) -> Vec<(String, u64)>;

    /// Produce this analyzer's report content.
    ///
    /// Default implementation ranks [`tally`](Self::tally). Analyzers that
    /// report a chart instead override this.
    fn output(&self, _sink: &ArtifactSink<'_>) -> Result<AnalyzerOutput> {
        Ok(AnalyzerOutput::Ranking(rank(self.tally())))
    }
}

// ============================================
// Engine
// ============================================

/// Collaborators and settings shared by every engine a service builds.
#[derive(Clone)]
pub struct EngineSetup {
    pub scratch: ScratchDir,
    pub segmenter: Arc<dyn Segmenter>,
    pub charts: Arc<dyn ChartRenderer>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub directory: Arc<dyn MemberDirectory>,
    pub avatars: Arc<dyn AvatarSource>,
    pub utc_offset_secs: i32,
    /// Leading ranked entries that get names and avatars
    pub ranking_depth: usize,
    /// Extra whole-pipeline attempts after a failed render
    pub render_retries: u32,
}

/// Title and header lines printed above the sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportMeta {
    pub title: String,
    pub header: Vec<String>,
}

/// One analyzer's final frequency map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzerTally {
    pub name: String,
    pub unit: String,
    pub entries: Vec<(String, u64)>,
}

/// Successful analysis: encoded frames plus the numbers behind them.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedReport {
    pub group_id: String,
    #[serde(flatten)]
    pub meta: ReportMeta,
    #[serde(skip)]
    pub frames: Vec<Vec<u8>>,
    /// In section order
    pub tallies: Vec<AnalyzerTally>,
}

/// Runs every analyzer over one event window and renders the report.
///
/// One engine serves one group. It is not shared between concurrent
/// requests; separate engines share no mutable state.
pub struct AnalysisEngine {
    group_id: String,
    meta: ReportMeta,
    analyzers: Vec<Box<dyn Analyzer>>,
    memo: Arc<MemoSegmenter>,
    setup: EngineSetup,
}

impl AnalysisEngine {
    /// Build an engine with one instance of every globally registered analyzer.
    pub fn new(group_id: &str, meta: ReportMeta, setup: EngineSetup) -> Self {
        let registry = registry::global().clone();
        Self::from_registry(group_id, meta, setup, &registry)
    }

    /// Build an engine from an explicit registry.
    pub fn from_registry(
        group_id: &str,
        meta: ReportMeta,
        setup: EngineSetup,
        registry: &AnalyzerRegistry,
    ) -> Self {
        let memo = Arc::new(MemoSegmenter::new(setup.segmenter.clone()));
        let mut engine = Self {
            group_id: group_id.to_string(),
            meta,
            analyzers: Vec::new(),
            memo,
            setup,
        };
        let ctx = engine.context();
        engine.analyzers = registry.build_all(&ctx);
        tracing::debug!(
            group_id,
            analyzers = engine.analyzers.len(),
            "Created analysis engine"
        );
        engine
    }

    /// Context handed to analyzer constructors.
    pub fn context(&self) -> AnalyzerContext {
        AnalyzerContext {
            group_id: self.group_id.clone(),
            utc_offset_secs: self.setup.utc_offset_secs,
            segmenter: self.memo.clone(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Append an analyzer after the registered ones.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        tracing::info!(analyzer = analyzer.name(), "Registered analyzer");
        self.analyzers.push(analyzer);
    }

    /// Display names, in section order.
    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn clear_analyzers(&mut self) {
        self.analyzers.clear();
    }

    /// Reset every analyzer, then feed each event to each analyzer once.
    pub fn run_pass(&mut self, events: &[Event]) {
        for analyzer in &mut self.analyzers {
            analyzer.reset();
        }
        self.memo.clear();

        for event in events {
            for analyzer in &mut self.analyzers {
                analyzer.process_event(event);
            }
        }

        self.memo.clear();
        tracing::debug!(
            group_id = %self.group_id,
            events = events.len(),
            analyzers = self.analyzers.len(),
            "Analysis pass complete"
        );
    }

    /// Current frequency map of every analyzer, in section order.
    pub fn tallies(&self) -> Vec<AnalyzerTally> {
        self.analyzers
            .iter()
            .map(|a| AnalyzerTally {
                name: a.name().to_string(),
                unit: a.unit().to_string(),
                entries: a.tally(),
            })
            .collect()
    }

    /// Turn analyzer state into a renderable report.
    ///
    /// Rankings are enriched; artifacts are written to scratch storage. If
    /// an analyzer fails, artifacts written so far are discarded.
    pub async fn collect(&self) -> Result<Report> {
        let sink = ArtifactSink {
            charts: self.setup.charts.as_ref(),
            scratch: &self.setup.scratch,
        };
        let enricher = Enricher::new(
            self.setup.directory.clone(),
            self.setup.avatars.clone(),
            self.setup.ranking_depth,
        );

        let mut report = Report {
            title: self.meta.title.clone(),
            header: self.meta.header.clone(),
            sections: Vec::with_capacity(self.analyzers.len()),
        };

        for analyzer in &self.analyzers {
            let output = match analyzer.output(&sink) {
                Ok(output) => output,
                Err(e) => {
                    report.discard_artifacts();
                    return Err(e);
                }
            };
            let content = match output {
                AnalyzerOutput::Ranking(ranking) => SectionContent::Ranking(
                    enricher
                        .enrich(&self.group_id, &ranking, analyzer.unit())
                        .await,
                ),
                AnalyzerOutput::Artifact(handle) => SectionContent::Artifact(handle),
            };
            report.sections.push(Section {
                name: analyzer.name().to_string(),
                unit: analyzer.unit().to_string(),
                content,
            });
        }

        Ok(report)
    }

    /// Analyze `events` and render the report.
    ///
    /// A render that fails or yields no frames reruns the whole pipeline,
    /// analyzers included, up to `render_retries` more times.
    pub async fn analyze(&mut self, events: &[Event]) -> Result<RenderedReport> {
        let attempts = self.setup.render_retries + 1;
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            let start = Instant::now();
            self.run_pass(events);
            let report = self.collect().await?;
            let rendered = self.setup.renderer.render(&report).await;
            report.discard_artifacts();

            match rendered {
                Ok(frames) if !frames.is_empty() => {
                    tracing::info!(
                        group_id = %self.group_id,
                        events = events.len(),
                        frames = frames.len(),
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Report rendered"
                    );
                    return Ok(RenderedReport {
                        group_id: self.group_id.clone(),
                        meta: self.meta.clone(),
                        frames,
                        tallies: self.tallies(),
                    });
                }
                Ok(_) => {
                    last_failure = "renderer produced no frames".to_string();
                    tracing::warn!(group_id = %self.group_id, attempt, "Renderer produced no frames");
                }
                Err(e) => {
                    last_failure = e.to_string();
                    tracing::warn!(group_id = %self.group_id, attempt, error = %e, "Render failed");
                }
            }
        }

        Err(Error::Render(format!(
            "gave up after {} attempts: {}",
            attempts, last_failure
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::frequency::FrequencyMap;
    use crate::analytics::plugins;
    use crate::enrich::RankedEntry;
    use crate::render::text::bundled_font;
    use crate::render::BlockChartRenderer;
    use crate::segment::JiebaSegmenter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct EchoDirectory;

    #[async_trait]
    impl MemberDirectory for EchoDirectory {
        async fn display_name(&self, _group_id: &str, user_id: &str) -> Result<String> {
            Ok(format!("member {user_id}"))
        }
    }

    struct NoAvatars;

    #[async_trait]
    impl AvatarSource for NoAvatars {
        async fn get_avatar(&self, user_id: &str) -> Result<Vec<u8>> {
            Err(Error::Avatar(format!("no avatar for {user_id}")))
        }
    }

    /// Fails the first `failures` calls, then returns one frame.
    struct FlakyRenderer {
        failures: usize,
        calls: AtomicUsize,
        seen: Mutex<Vec<Report>>,
    }

    impl FlakyRenderer {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReportRenderer for FlakyRenderer {
        async fn render(&self, report: &Report) -> Result<Vec<Vec<u8>>> {
            // artifacts must still exist while rendering
            for handle in report.artifacts() {
                assert!(handle.path().exists());
            }
            self.seen.lock().unwrap().push(report.clone());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Ok(vec![]);
            }
            Ok(vec![vec![1, 2, 3]])
        }
    }

    /// Counts how many events it has seen since the last reset.
    struct Counter {
        seen: FrequencyMap<String>,
        resets: Arc<AtomicUsize>,
    }

    impl Analyzer for Counter {
        fn name(&self) -> &str {
            "Counter"
        }
        fn unit(&self) -> &str {
            "events"
        }
        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
            self.seen.clear();
        }
        fn process_event(&mut self, _event: &Event) {
            self.seen.add("all".to_string(), 1);
        }
        fn tally(&self) -> Vec<(String, u64)> {
            self.seen.ranked()
        }
    }

    fn setup(scratch: &std::path::Path, renderer: Arc<dyn ReportRenderer>) -> EngineSetup {
        crate::logging::init_test();
        EngineSetup {
            scratch: ScratchDir::new(scratch),
            segmenter: Arc::new(JiebaSegmenter::new()),
            charts: Arc::new(BlockChartRenderer::new(bundled_font().unwrap())),
            renderer,
            directory: Arc::new(EchoDirectory),
            avatars: Arc::new(NoAvatars),
            utc_offset_secs: 0,
            ranking_depth: 3,
            render_retries: 3,
        }
    }

    fn registry() -> AnalyzerRegistry {
        let mut registry = AnalyzerRegistry::new();
        registry.register(plugins::activity::SENDER_ACTIVITY);
        registry.register(plugins::hourly::HOURLY_ACTIVITY);
        registry
    }

    fn events() -> Vec<Event> {
        vec![
            Event::text("A", 9 * 3600, "morning"),
            Event::text("A", 9 * 3600 + 60, "again"),
            Event::text("B", 14 * 3600, "afternoon"),
        ]
    }

    #[test]
    fn test_rank_numbers_from_one() {
        let ranked = rank(vec![("a".to_string(), 5), ("b".to_string(), 5)]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[1].subject, "b");
    }

    #[test]
    fn test_run_pass_resets_and_feeds_every_analyzer_once() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(FlakyRenderer::new(0));
        let mut engine = AnalysisEngine::from_registry(
            "g1",
            ReportMeta::default(),
            setup(dir.path(), renderer),
            &AnalyzerRegistry::new(),
        );
        let resets = Arc::new(AtomicUsize::new(0));
        engine.register(Box::new(Counter {
            seen: FrequencyMap::new(),
            resets: resets.clone(),
        }));

        engine.run_pass(&events());
        engine.run_pass(&events());

        assert_eq!(resets.load(Ordering::SeqCst), 2);
        assert_eq!(engine.tallies()[0].entries, vec![("all".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_analyze_scenario_sections_follow_registry_order() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(FlakyRenderer::new(0));
        let mut engine = AnalysisEngine::from_registry(
            "g1",
            ReportMeta {
                title: "Summary".to_string(),
                header: vec!["window".to_string()],
            },
            setup(dir.path(), renderer.clone()),
            &registry(),
        );
        assert_eq!(engine.analyzer_names(), vec!["Chatterbox", "Hourly Activity"]);

        let report = engine.analyze(&events()).await.unwrap();
        assert_eq!(report.frames, vec![vec![1, 2, 3]]);
        assert_eq!(
            report.tallies[0].entries,
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
        assert_eq!(
            report.tallies[1].entries,
            vec![("9".to_string(), 2), ("14".to_string(), 1)]
        );

        let seen = renderer.seen.lock().unwrap();
        let sections = &seen[0].sections;
        assert_eq!(sections[0].name, "Chatterbox");
        match &sections[0].content {
            SectionContent::Ranking(entries) => {
                let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
                assert_eq!(names, vec!["member A", "member B"]);
                assert_eq!(entries[0].count_label, "2 messages");
                assert!(entries.iter().all(|e: &RankedEntry| e.avatar.is_none()));
            }
            other => panic!("expected ranking, got {other:?}"),
        }
        assert!(matches!(sections[1].content, SectionContent::Artifact(_)));

        // scratch artifacts are gone once rendering is done
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_retries_whole_pipeline_until_render_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(FlakyRenderer::new(2));
        let mut engine = AnalysisEngine::from_registry(
            "g1",
            ReportMeta::default(),
            setup(dir.path(), renderer.clone()),
            &registry(),
        );

        let report = engine.analyze(&events()).await.unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 3);
        // reruns start from a reset, so counts are not doubled
        assert_eq!(report.tallies[0].entries[0], ("A".to_string(), 2));
    }

    #[tokio::test]
    async fn test_analyze_gives_up_after_retry_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(FlakyRenderer::new(usize::MAX));
        let mut engine = AnalysisEngine::from_registry(
            "g1",
            ReportMeta::default(),
            setup(dir.path(), renderer.clone()),
            &registry(),
        );

        let err = engine.analyze(&events()).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_window_yields_empty_rankings() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(FlakyRenderer::new(0));
        let mut engine = AnalysisEngine::from_registry(
            "g1",
            ReportMeta::default(),
            setup(dir.path(), renderer.clone()),
            &registry(),
        );

        let report = engine.analyze(&[]).await.unwrap();
        assert!(report.tallies.iter().all(|t| t.entries.is_empty()));
        let seen = renderer.seen.lock().unwrap();
        assert!(matches!(
            &seen[0].sections[0].content,
            SectionContent::Ranking(entries) if entries.is_empty()
        ));
    }
}

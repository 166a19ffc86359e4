//! The process-wide registry is shared, so the test that rewrites it lives in
//! its own test binary.

use async_trait::async_trait;
use groupstat_core::analytics::plugins::activity::SENDER_ACTIVITY;
use groupstat_core::analytics::{
    clear_registry, register, registered, AnalysisEngine, EngineSetup, ReportMeta,
};
use groupstat_core::enrich::{AvatarSource, MemberDirectory};
use groupstat_core::render::text::bundled_font;
use groupstat_core::render::{BlockChartRenderer, ScratchDir, StackedReportRenderer};
use groupstat_core::segment::JiebaSegmenter;
use groupstat_core::{Error, Result};
use std::sync::Arc;

struct Offline;

#[async_trait]
impl MemberDirectory for Offline {
    async fn display_name(&self, _group_id: &str, user_id: &str) -> Result<String> {
        Ok(user_id.to_string())
    }
}

#[async_trait]
impl AvatarSource for Offline {
    async fn get_avatar(&self, _user_id: &str) -> Result<Vec<u8>> {
        Err(Error::Avatar("offline".to_string()))
    }
}

#[test]
fn test_engines_pick_up_registry_changes() {
    assert_eq!(registered().len(), 7);

    clear_registry();
    assert!(registered().is_empty());

    assert!(register(SENDER_ACTIVITY));
    assert!(!register(SENDER_ACTIVITY));
    let ids: Vec<&str> = registered().iter().map(|k| k.id).collect();
    assert_eq!(ids, vec!["core.sender_activity"]);

    let dir = tempfile::tempdir().unwrap();
    let font = bundled_font().unwrap();
    let setup = EngineSetup {
        scratch: ScratchDir::new(dir.path()),
        segmenter: Arc::new(JiebaSegmenter::new()),
        charts: Arc::new(BlockChartRenderer::new(font.clone())),
        renderer: Arc::new(StackedReportRenderer::new(font)),
        directory: Arc::new(Offline),
        avatars: Arc::new(Offline),
        utc_offset_secs: 0,
        ranking_depth: 3,
        render_retries: 0,
    };
    let engine = AnalysisEngine::new("g1", ReportMeta::default(), setup);
    assert_eq!(engine.analyzer_names(), vec!["Chatterbox"]);
}

//! Chat analytics
//!
//! - [`engine`]: the [`Analyzer`] trait and the [`AnalysisEngine`] that runs
//!   every analyzer over one event window and renders the report
//! - [`registry`]: ordered discovery of analyzer kinds
//! - [`frequency`]: the insertion-ordered counter analyzers accumulate into
//! - [`plugins`]: built-in analyzers

pub mod engine;
pub mod frequency;
pub mod plugins;
pub mod registry;

pub use engine::{
    rank, AnalysisEngine, Analyzer, AnalyzerContext, AnalyzerOutput, AnalyzerTally, ArtifactSink,
    EngineSetup, RankedCount, RenderedReport, ReportMeta,
};
pub use frequency::FrequencyMap;
pub use registry::{clear_registry, register, registered, AnalyzerKind, AnalyzerRegistry};

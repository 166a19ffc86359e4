//! Rendering collaborators.
//!
//! Analysis hands rendering a [`Report`]: a title, header lines, and an
//! ordered list of sections. Each section is either a ranking or an image an
//! analyzer already produced. Turning that into pixels is the job of a
//! [`ReportRenderer`]; drawing per-analyzer charts is the job of a
//! [`ChartRenderer`].
//!
//! Built-in implementations, drawn with `image` and `imageproc`:
//! - [`BlockChartRenderer`]: labeled bar charts, hour strips, word clouds
//! - [`StackedReportRenderer`]: stacks sections into one PNG
//!
//! Both take the font chosen by [`text::resolve_font`].

pub mod charts;
pub mod report;
pub mod scratch;
pub mod text;

pub use charts::BlockChartRenderer;
pub use report::StackedReportRenderer;
pub use scratch::{ArtifactHandle, ScratchDir};
pub use text::resolve_font;

use crate::enrich::RankedEntry;
use crate::error::Result;
use async_trait::async_trait;
use image::RgbaImage;

/// Draws the auxiliary charts some analyzers report instead of rankings.
pub trait ChartRenderer: Send + Sync {
    /// Horizontal bars, one per `(label, value)`, longest first.
    fn bar_chart(&self, bars: &[(String, u64)]) -> Result<RgbaImage>;

    /// One block per `(hour, value)`, in display order.
    fn hour_strip(&self, hours: &[(u8, u64)]) -> Result<RgbaImage>;

    /// Word cloud from `(word, frequency)` pairs, most frequent first.
    fn word_cloud(&self, words: &[(String, u64)]) -> Result<RgbaImage>;
}

/// Content of one report section.
#[derive(Debug, Clone)]
pub enum SectionContent {
    /// Ranked users, best first (possibly empty)
    Ranking(Vec<RankedEntry>),
    /// Image already rendered into scratch storage
    Artifact(ArtifactHandle),
}

/// One analyzer's contribution to a report.
#[derive(Debug, Clone)]
pub struct Section {
    /// Analyzer display name
    pub name: String,
    /// Counted-quantity label
    pub unit: String,
    pub content: SectionContent,
}

/// Structured input for a [`ReportRenderer`].
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub header: Vec<String>,
    /// In analyzer registration order
    pub sections: Vec<Section>,
}

impl Report {
    /// Scratch images referenced by this report.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.sections.iter().filter_map(|s| match &s.content {
            SectionContent::Artifact(handle) => Some(handle),
            SectionContent::Ranking(_) => None,
        })
    }

    /// Remove every scratch image this report references.
    pub fn discard_artifacts(&self) {
        for handle in self.artifacts() {
            handle.discard();
        }
    }
}

/// Turns a [`Report`] into encoded image frames.
///
/// An empty frame list or an error means the render failed; callers may
/// retry.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, report: &Report) -> Result<Vec<Vec<u8>>>;
}

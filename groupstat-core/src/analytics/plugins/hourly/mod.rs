//! Hourly activity analyzer
//!
//! Buckets messages by hour of day in the configured UTC offset and reports
//! a 24-block strip starting at the hour of the first message seen, so an
//! overnight window reads left to right.

use crate::analytics::engine::{Analyzer, AnalyzerContext, AnalyzerOutput, ArtifactSink};
use crate::analytics::frequency::FrequencyMap;
use crate::analytics::registry::AnalyzerKind;
use crate::error::Result;
use crate::types::Event;

pub const HOURLY_ACTIVITY: AnalyzerKind = AnalyzerKind {
    id: "core.hourly_activity",
    build: build_hourly_activity,
};

fn build_hourly_activity(ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(HourlyActivityAnalyzer::new(ctx.utc_offset_secs))
}

/// Hour of day (0-23) for a Unix timestamp shifted by `offset_secs`.
pub fn hour_of_day(timestamp: i64, offset_secs: i32) -> u8 {
    (timestamp + offset_secs as i64).div_euclid(3600).rem_euclid(24) as u8
}

/// Message counts per hour of day.
#[derive(Debug)]
pub struct HourlyActivityAnalyzer {
    offset_secs: i32,
    counts: FrequencyMap<u8>,
    start_hour: Option<u8>,
}

impl HourlyActivityAnalyzer {
    pub fn new(offset_secs: i32) -> Self {
        Self {
            offset_secs,
            counts: FrequencyMap::new(),
            start_hour: None,
        }
    }

    /// Hour of the first message since the last reset.
    pub fn start_hour(&self) -> Option<u8> {
        self.start_hour
    }

    pub fn count(&self, hour: u8) -> u64 {
        self.counts.get(&hour)
    }

    /// All 24 hours in display order, starting at [`start_hour`](Self::start_hour)
    /// (midnight if nothing was seen).
    pub fn strip(&self) -> Vec<(u8, u64)> {
        let start = self.start_hour.unwrap_or(0);
        (0..24u8)
            .map(|i| {
                let hour = (start + i) % 24;
                (hour, self.counts.get(&hour))
            })
            .collect()
    }
}

impl Analyzer for HourlyActivityAnalyzer {
    fn name(&self) -> &str {
        "Hourly Activity"
    }

    fn unit(&self) -> &str {
        "messages"
    }

    fn reset(&mut self) {
        self.counts.clear();
        self.start_hour = None;
    }

    fn process_event(&mut self, event: &Event) {
        let hour = hour_of_day(event.timestamp, self.offset_secs);
        self.start_hour.get_or_insert(hour);
        self.counts.add(hour, 1);
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.counts
            .ranked()
            .into_iter()
            .map(|(hour, count)| (hour.to_string(), count))
            .collect()
    }

    fn output(&self, sink: &ArtifactSink<'_>) -> Result<AnalyzerOutput> {
        let chart = sink.charts.hour_strip(&self.strip())?;
        let handle = sink.scratch.save_png("hourly", &chart)?;
        Ok(AnalyzerOutput::Artifact(handle))
    }
}

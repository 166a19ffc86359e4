//! Sender activity analyzers
//!
//! | Analyzer | Key | Aggregation |
//! |----------|-----|-------------|
//! | Chatterbox | sender id | +1 per message |
//! | Longform Writer | sender id | max plain-text length of one message |
//!
//! Longform Writer is the only built-in analyzer that keeps a maximum
//! instead of a sum, so its values do not add up to the event count.

use crate::analytics::engine::{Analyzer, AnalyzerContext};
use crate::analytics::frequency::FrequencyMap;
use crate::analytics::registry::AnalyzerKind;
use crate::types::Event;

pub const SENDER_ACTIVITY: AnalyzerKind = AnalyzerKind {
    id: "core.sender_activity",
    build: build_sender_activity,
};

pub const LONGEST_MESSAGE: AnalyzerKind = AnalyzerKind {
    id: "core.longest_message",
    build: build_longest_message,
};

fn build_sender_activity(_ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(SenderActivityAnalyzer::new())
}

fn build_longest_message(_ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(LongestMessageAnalyzer::new())
}

/// Counts messages per sender.
#[derive(Debug, Default)]
pub struct SenderActivityAnalyzer {
    counts: FrequencyMap<String>,
}

impl SenderActivityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for SenderActivityAnalyzer {
    fn name(&self) -> &str {
        "Chatterbox"
    }

    fn unit(&self) -> &str {
        "messages"
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn process_event(&mut self, event: &Event) {
        self.counts.add(event.sender_id.clone(), 1);
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.counts.ranked()
    }
}

/// Tracks each sender's longest single message, in characters.
#[derive(Debug, Default)]
pub struct LongestMessageAnalyzer {
    longest: FrequencyMap<String>,
}

impl LongestMessageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analyzer for LongestMessageAnalyzer {
    fn name(&self) -> &str {
        "Longform Writer"
    }

    fn unit(&self) -> &str {
        "chars"
    }

    fn reset(&mut self) {
        self.longest.clear();
    }

    fn process_event(&mut self, event: &Event) {
        let length = event.plain_text_len();
        // image-only messages don't put the sender on the board
        if length > 0 {
            self.longest.raise_to(event.sender_id.clone(), length);
        }
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.longest.ranked()
    }
}

//! Image analyzers
//!
//! Static pictures and animated stickers arrive as the same segment type;
//! they are told apart by the segment's `animated` flag, so a message never
//! counts towards both boards.

use crate::analytics::engine::{Analyzer, AnalyzerContext};
use crate::analytics::frequency::FrequencyMap;
use crate::analytics::registry::AnalyzerKind;
use crate::types::Event;

pub const IMAGE_COUNT: AnalyzerKind = AnalyzerKind {
    id: "core.image_count",
    build: build_image_count,
};

pub const EMOTICON_COUNT: AnalyzerKind = AnalyzerKind {
    id: "core.emoticon_count",
    build: build_emoticon_count,
};

fn build_image_count(_ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(ImageCountAnalyzer::images())
}

fn build_emoticon_count(_ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(ImageCountAnalyzer::stickers())
}

/// Counts image segments per sender, filtered on animation.
#[derive(Debug)]
pub struct ImageCountAnalyzer {
    name: &'static str,
    unit: &'static str,
    animated: bool,
    counts: FrequencyMap<String>,
}

impl ImageCountAnalyzer {
    /// Static pictures.
    pub fn images() -> Self {
        Self {
            name: "Image Sharer",
            unit: "images",
            animated: false,
            counts: FrequencyMap::new(),
        }
    }

    /// Animated stickers.
    pub fn stickers() -> Self {
        Self {
            name: "Sticker King",
            unit: "stickers",
            animated: true,
            counts: FrequencyMap::new(),
        }
    }
}

impl Analyzer for ImageCountAnalyzer {
    fn name(&self) -> &str {
        self.name
    }

    fn unit(&self) -> &str {
        self.unit
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn process_event(&mut self, event: &Event) {
        let count = event.image_count(self.animated);
        if count > 0 {
            self.counts.add(event.sender_id.clone(), count);
        }
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.counts.ranked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    fn mixed(sender: &str) -> Event {
        Event::new(
            sender,
            0,
            "",
            vec![
                Segment::image("a.png", false),
                Segment::text("look"),
                Segment::image("b.gif", true),
                Segment::image("c.png", false),
            ],
        )
    }

    #[test]
    fn test_images_and_stickers_are_counted_separately() {
        let mut images = ImageCountAnalyzer::images();
        let mut stickers = ImageCountAnalyzer::stickers();
        for event in [mixed("A"), mixed("B"), Event::text("C", 0, "no pictures")] {
            images.process_event(&event);
            stickers.process_event(&event);
        }

        assert_eq!(
            images.tally(),
            vec![("A".to_string(), 2), ("B".to_string(), 2)]
        );
        assert_eq!(
            stickers.tally(),
            vec![("A".to_string(), 1), ("B".to_string(), 1)]
        );
        assert_eq!(stickers.name(), "Sticker King");
    }

    #[test]
    fn test_one_image_per_event_totals_event_count() {
        let mut images = ImageCountAnalyzer::images();
        let events: Vec<Event> = ["A", "B", "A", "A"]
            .iter()
            .map(|s| Event::new(*s, 0, "", vec![Segment::image("x.png", false)]))
            .collect();
        for event in &events {
            images.process_event(event);
        }
        let total: u64 = images.tally().iter().map(|(_, v)| v).sum();
        assert_eq!(total, events.len() as u64);
    }
}

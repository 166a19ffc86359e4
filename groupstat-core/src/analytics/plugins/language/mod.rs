//! Language analyzers: part-of-speech distribution and word cloud
//!
//! Both analyzers read the same tokens. Text segments that look like bot
//! commands (leading `/`) are skipped, the rest are joined with spaces,
//! stripped down to CJK ideographs, ASCII letters, digits and whitespace,
//! then segmented. Tokens shorter than two characters and stop words are
//! dropped.
//!
//! The segmenter the engine hands out memoizes per text, so a message is
//! segmented once no matter how many analyzers read it.

use crate::analytics::engine::{Analyzer, AnalyzerContext, AnalyzerOutput, ArtifactSink};
use crate::analytics::frequency::FrequencyMap;
use crate::analytics::registry::AnalyzerKind;
use crate::error::Result;
use crate::segment::{Segmenter, Token};
use crate::types::Event;
use std::sync::Arc;

pub const PART_OF_SPEECH: AnalyzerKind = AnalyzerKind {
    id: "core.part_of_speech",
    build: build_part_of_speech,
};

pub const WORD_CLOUD: AnalyzerKind = AnalyzerKind {
    id: "core.word_cloud",
    build: build_word_cloud,
};

fn build_part_of_speech(ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(PartOfSpeechAnalyzer::new(ctx.segmenter.clone()))
}

fn build_word_cloud(ctx: &AnalyzerContext) -> Box<dyn Analyzer> {
    Box::new(WordCloudAnalyzer::new(ctx.segmenter.clone()))
}

pub const STOP_WORDS: [&str; 7] = ["一个", "什么", "怎么", "这个", "那个", "这样", "那样"];

const COMMAND_PREFIX: char = '/';
const MIN_TOKEN_CHARS: usize = 2;

/// Categories shown in the part-of-speech chart.
pub const POS_CHART_SIZE: usize = 3;
/// Words drawn in the word cloud.
pub const WORD_CLOUD_SIZE: usize = 100;

/// Tag letter to category name. Unlisted letters fall back to [`OTHER_CATEGORY`].
const POS_CATEGORIES: [(char, &str); 16] = [
    ('n', "noun"),
    ('v', "verb"),
    ('a', "adjective"),
    ('d', "adverb"),
    ('p', "preposition"),
    ('c', "conjunction"),
    ('u', "particle"),
    ('m', "numeral"),
    ('q', "measure word"),
    ('r', "pronoun"),
    ('e', "interjection"),
    ('o', "onomatopoeia"),
    ('i', "idiom"),
    ('j', "abbreviation"),
    ('l', "idiomatic phrase"),
    ('x', "other"),
];

/// Whole tags that must not fold by first letter.
const WHOLE_TAG_CATEGORIES: [(&str, &str); 1] = [("eng", "foreign word")];

pub const OTHER_CATEGORY: &str = "other";

/// Category for a segmenter tag. Apart from a few whole tags, only the
/// first letter matters; sub-tags such as `nr` or `vn` fold into their parent.
pub fn pos_category(tag: &str) -> &'static str {
    if let Some((_, name)) = WHOLE_TAG_CATEGORIES.iter().find(|(t, _)| *t == tag) {
        return name;
    }
    let letter = tag.chars().next().unwrap_or('x');
    POS_CATEGORIES
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|(_, name)| *name)
        .unwrap_or(OTHER_CATEGORY)
}

fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| {
            ('\u{4e00}'..='\u{9fa5}').contains(c) || c.is_ascii_alphanumeric() || c.is_whitespace()
        })
        .collect()
}

/// Countable tokens of one message.
pub fn extract_tokens(segmenter: &dyn Segmenter, event: &Event) -> Vec<Token> {
    let mut joined = String::new();
    for text in event.text_segments() {
        if text.starts_with(COMMAND_PREFIX) {
            continue;
        }
        joined.push_str(text);
        joined.push(' ');
    }

    let cleaned = clean(&joined);
    if cleaned.trim().is_empty() {
        return Vec::new();
    }

    segmenter
        .segment_with_tags(&cleaned)
        .into_iter()
        .filter_map(|token| {
            let word = token.word.trim();
            let keep = word.chars().count() >= MIN_TOKEN_CHARS
                && !STOP_WORDS.contains(&word.to_lowercase().as_str());
            keep.then(|| Token::new(word, token.tag))
        })
        .collect()
}

/// Tallies tokens by part-of-speech category; reports a bar chart of the top three.
pub struct PartOfSpeechAnalyzer {
    segmenter: Arc<dyn Segmenter>,
    categories: FrequencyMap<&'static str>,
}

impl PartOfSpeechAnalyzer {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            categories: FrequencyMap::new(),
        }
    }
}

impl Analyzer for PartOfSpeechAnalyzer {
    fn name(&self) -> &str {
        "Part of Speech"
    }

    fn unit(&self) -> &str {
        "times"
    }

    fn reset(&mut self) {
        self.categories.clear();
    }

    fn process_event(&mut self, event: &Event) {
        for token in extract_tokens(self.segmenter.as_ref(), event) {
            self.categories.add(pos_category(&token.tag), 1);
        }
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.categories
            .ranked()
            .into_iter()
            .map(|(category, count)| (category.to_string(), count))
            .collect()
    }

    fn output(&self, sink: &ArtifactSink<'_>) -> Result<AnalyzerOutput> {
        let bars: Vec<(String, u64)> = self
            .categories
            .top(POS_CHART_SIZE)
            .into_iter()
            .map(|(category, count)| (category.to_string(), count))
            .collect();
        let chart = sink.charts.bar_chart(&bars)?;
        Ok(AnalyzerOutput::Artifact(sink.scratch.save_png("pos", &chart)?))
    }
}

/// Tallies individual words; reports a word cloud of the most frequent.
pub struct WordCloudAnalyzer {
    segmenter: Arc<dyn Segmenter>,
    words: FrequencyMap<String>,
}

impl WordCloudAnalyzer {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            words: FrequencyMap::new(),
        }
    }
}

impl Analyzer for WordCloudAnalyzer {
    fn name(&self) -> &str {
        "Word Cloud"
    }

    fn unit(&self) -> &str {
        "times"
    }

    fn reset(&mut self) {
        self.words.clear();
    }

    fn process_event(&mut self, event: &Event) {
        for token in extract_tokens(self.segmenter.as_ref(), event) {
            self.words.add(token.word, 1);
        }
    }

    fn tally(&self) -> Vec<(String, u64)> {
        self.words.ranked()
    }

    fn output(&self, sink: &ArtifactSink<'_>) -> Result<AnalyzerOutput> {
        let chart = sink.charts.word_cloud(&self.words.top(WORD_CLOUD_SIZE))?;
        Ok(AnalyzerOutput::Artifact(
            sink.scratch.save_png("wordcloud", &chart)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BlockChartRenderer, ScratchDir};
    use crate::render::text::bundled_font;
    use crate::segment::{JiebaSegmenter, MemoSegmenter};
    use crate::types::Segment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Splits on whitespace and tags by a fixed table.
    struct TableSegmenter {
        calls: AtomicUsize,
    }

    impl Segmenter for TableSegmenter {
        fn segment_with_tags(&self, text: &str) -> Vec<Token> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            text.split_whitespace()
                .map(|w| {
                    let tag = match w {
                        "吃饭" | "run" => "v",
                        "好看" => "a",
                        "北京" => "ns",
                        "嗯嗯" => "zg",
                        _ => "n",
                    };
                    Token::new(w, tag)
                })
                .collect()
        }
    }

    fn table() -> Arc<TableSegmenter> {
        Arc::new(TableSegmenter {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_pos_category_uses_first_letter() {
        assert_eq!(pos_category("n"), "noun");
        assert_eq!(pos_category("nr"), "noun");
        assert_eq!(pos_category("vn"), "verb");
        assert_eq!(pos_category("eng"), "foreign word");
        assert_eq!(pos_category("e"), "interjection");
        assert_eq!(pos_category("zg"), OTHER_CATEGORY);
        assert_eq!(pos_category(""), "other");
    }

    #[test]
    fn test_extract_tokens_filters_commands_short_words_and_stop_words() {
        let segmenter = table();
        let event = Event::new(
            "A",
            0,
            "",
            vec![
                Segment::text("/report 23:00"),
                Segment::text("rust is great!"),
                Segment::image("x.png", false),
                Segment::text("什么 a 42"),
            ],
        );
        let words: Vec<String> = extract_tokens(segmenter.as_ref(), &event)
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert_eq!(words, vec!["rust", "is", "great", "42"]);
    }

    #[test]
    fn test_chinese_sentence_splits_into_tagged_words() {
        let sentence = "我今天吃了很好吃的北京烤鸭";
        let segmenter = JiebaSegmenter::new();
        let words: Vec<String> = extract_tokens(&segmenter, &Event::text("A", 0, sentence))
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert!(words.len() >= 3, "{words:?}");
        assert!(words.contains(&"今天".to_string()));
        assert!(words.iter().all(|w| w.as_str() != sentence));

        let mut analyzer = PartOfSpeechAnalyzer::new(Arc::new(segmenter));
        analyzer.process_event(&Event::text("A", 0, sentence));
        let categories: Vec<String> = analyzer.tally().into_iter().map(|(c, _)| c).collect();
        assert!(categories.contains(&"noun".to_string()), "{categories:?}");
    }

    #[test]
    fn test_part_of_speech_tallies_categories() {
        let mut analyzer = PartOfSpeechAnalyzer::new(table());
        analyzer.process_event(&Event::text("A", 0, "吃饭 北京 好看"));
        analyzer.process_event(&Event::text("B", 0, "run 嗯嗯 北京"));

        assert_eq!(
            analyzer.tally(),
            vec![
                ("verb".to_string(), 2),
                ("noun".to_string(), 2),
                ("adjective".to_string(), 1),
                ("other".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_word_cloud_counts_words() {
        let mut analyzer = WordCloudAnalyzer::new(table());
        analyzer.process_event(&Event::text("A", 0, "北京 吃饭"));
        analyzer.process_event(&Event::text("B", 0, "北京"));

        assert_eq!(
            analyzer.tally(),
            vec![("北京".to_string(), 2), ("吃饭".to_string(), 1)]
        );
    }

    #[test]
    fn test_shared_memo_segments_each_message_once() {
        let inner = table();
        let memo: Arc<dyn Segmenter> = Arc::new(MemoSegmenter::new(inner.clone()));
        let mut pos = PartOfSpeechAnalyzer::new(memo.clone());
        let mut cloud = WordCloudAnalyzer::new(memo);

        let event = Event::text("A", 0, "北京 吃饭");
        pos.process_event(&event);
        cloud.process_event(&event);

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outputs_are_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path());
        let charts = BlockChartRenderer::new(bundled_font().unwrap());
        let sink = ArtifactSink {
            charts: &charts,
            scratch: &scratch,
        };

        let mut pos = PartOfSpeechAnalyzer::new(table());
        let mut cloud = WordCloudAnalyzer::new(table());
        let event = Event::text("A", 0, "北京 吃饭 好看 run");
        pos.process_event(&event);
        cloud.process_event(&event);

        assert!(matches!(pos.output(&sink).unwrap(), AnalyzerOutput::Artifact(_)));
        assert!(matches!(cloud.output(&sink).unwrap(), AnalyzerOutput::Artifact(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}

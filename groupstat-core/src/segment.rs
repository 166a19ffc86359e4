//! Word segmentation with part-of-speech tags.
//!
//! [`JiebaSegmenter`] is the built-in implementation. [`MemoSegmenter`] lets
//! several analyzers share one segmentation per message.

use jieba_rs::Jieba;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One segmented word and its part-of-speech tag (jieba-style tag letters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub tag: String,
}

impl Token {
    pub fn new(word: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            tag: tag.into(),
        }
    }
}

/// Splits text into tagged tokens.
pub trait Segmenter: Send + Sync {
    /// Segment `text` into ordered `(word, tag)` tokens.
    fn segment_with_tags(&self, text: &str) -> Vec<Token>;
}

/// Dictionary-based Chinese segmenter with part-of-speech tagging.
///
/// Wraps `jieba-rs` with its bundled dictionary; unknown words are found
/// with the HMM. Latin words come back tagged `eng`, digit runs `m`.
/// Loading the dictionary takes a moment, so build one and share it.
pub struct JiebaSegmenter {
    jieba: Jieba,
}

impl JiebaSegmenter {
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for JiebaSegmenter {
    fn segment_with_tags(&self, text: &str) -> Vec<Token> {
        self.jieba
            .tag(text, true)
            .into_iter()
            .filter(|tag| !tag.word.trim().is_empty())
            .map(|tag| Token::new(tag.word, tag.tag))
            .collect()
    }
}

/// Memoizes another segmenter for the length of one analysis session.
///
/// Several analyzers segment the same message text; with this wrapper each
/// distinct text is segmented once. Call [`MemoSegmenter::clear`] between
/// sessions.
pub struct MemoSegmenter {
    inner: Arc<dyn Segmenter>,
    memo: Mutex<HashMap<String, Vec<Token>>>,
}

impl MemoSegmenter {
    pub fn new(inner: Arc<dyn Segmenter>) -> Self {
        Self {
            inner,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Forget everything memoized so far.
    pub fn clear(&self) {
        self.memo.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of distinct texts memoized.
    pub fn len(&self) -> usize {
        self.memo.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Segmenter for MemoSegmenter {
    fn segment_with_tags(&self, text: &str) -> Vec<Token> {
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tokens) = memo.get(text) {
            return tokens.clone();
        }
        let tokens = self.inner.segment_with_tags(text);
        memo.insert(text.to_string(), tokens.clone());
        tokens
    }
}

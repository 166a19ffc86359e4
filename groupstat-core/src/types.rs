//! Core domain types for groupstat
//!
//! These types describe one group chat message as delivered by the chat host.
//! They are read-only to the analysis code: the host produces them, analyzers
//! only look at them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One chat message: sender, timestamp, raw text and typed segments |
//! | **Segment** | One typed piece of message content (text, image, mention...) |
//! | **Window** | The time range a report covers |
//! | **Subject** | The key an analyzer counts by (user id, hour, word...) |

use serde::{Deserialize, Serialize};

/// Marker the host puts in an image summary when the image is an animated sticker.
const ANIMATED_SUMMARY_MARKER: &str = "动画表情";

// ============================================
// Segments
// ============================================

/// One typed piece of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text
    Text { text: String },
    /// Image reference; `animated` marks stickers / animated emoticons
    Image { file: String, animated: bool },
    /// Mention of another member
    At { user_id: String },
    /// Built-in face emoji
    Face { id: String },
    /// Reply to an earlier message
    Reply { message_id: String },
    /// Anything else the host sends (records, files, cards...)
    Other { kind: String },
}

impl Segment {
    /// Convenience constructor for a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// Convenience constructor for an image segment.
    pub fn image(file: impl Into<String>, animated: bool) -> Self {
        Segment::Image {
            file: file.into(),
            animated,
        }
    }

    /// Decode a OneBot v11 message segment (`{"type": ..., "data": {...}}`).
    ///
    /// Unknown segment kinds become [`Segment::Other`], never an error.
    pub fn from_onebot(value: &serde_json::Value) -> Self {
        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let data = value.get("data").cloned().unwrap_or_default();
        let field = |name: &str| -> String {
            match data.get(name) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };

        match kind {
            "text" => Segment::Text {
                text: field("text"),
            },
            "image" => {
                let summary = field("summary");
                let sub_type = field("sub_type");
                Segment::Image {
                    file: field("file"),
                    animated: summary.contains(ANIMATED_SUMMARY_MARKER) || sub_type == "1",
                }
            }
            "at" => Segment::At {
                user_id: field("qq"),
            },
            "face" => Segment::Face { id: field("id") },
            "reply" => Segment::Reply {
                message_id: field("id"),
            },
            other => Segment::Other {
                kind: other.to_string(),
            },
        }
    }
}

// ============================================
// Event
// ============================================

/// One chat message.
///
/// Events are ordered by `timestamp` (seconds since the Unix epoch) wherever
/// a sequence of them is passed around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Sender's user id
    pub sender_id: String,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Raw message text as the host serialized it
    pub raw_text: String,
    /// Typed content, in display order
    pub segments: Vec<Segment>,
}

impl Event {
    /// Build an event from parts.
    pub fn new(
        sender_id: impl Into<String>,
        timestamp: i64,
        raw_text: impl Into<String>,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            timestamp,
            raw_text: raw_text.into(),
            segments,
        }
    }

    /// Shorthand for a message made of one text segment.
    pub fn text(sender_id: impl Into<String>, timestamp: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(sender_id, timestamp, text.clone(), vec![Segment::text(text)])
    }

    /// Iterate the text of every text segment.
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Plain-text length in characters across all text segments.
    pub fn plain_text_len(&self) -> u64 {
        self.text_segments().map(|t| t.chars().count() as u64).sum()
    }

    /// Count image segments, filtered by whether they are animated.
    pub fn image_count(&self, animated: bool) -> u64 {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Image { animated: a, .. } if *a == animated))
            .count() as u64
    }

    /// Decode a OneBot v11 message record.
    ///
    /// Returns `None` when the record has no sender or no timestamp.
    pub fn from_onebot(value: &serde_json::Value) -> Option<Self> {
        let sender_id = value
            .get("user_id")
            .or_else(|| value.get("sender").and_then(|s| s.get("user_id")))
            .and_then(id_string)?;
        let timestamp = value.get("time").and_then(|t| t.as_i64())?;
        let raw_text = value
            .get("raw_message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let segments = match value.get("message") {
            Some(serde_json::Value::Array(items)) => {
                items.iter().map(Segment::from_onebot).collect()
            }
            Some(serde_json::Value::String(s)) => vec![Segment::text(s.clone())],
            _ => Vec::new(),
        };

        Some(Self {
            sender_id,
            timestamp,
            raw_text,
            segments,
        })
    }
}

/// OneBot ids arrive as numbers or strings depending on the implementation.
pub(crate) fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//! Built-in analyzers
//!
//! Each analyzer family lives in its own subdirectory.
//!
//! ## Built-in Analyzers
//!
//! - [`activity`]: messages per sender, longest message per sender
//! - [`media`]: static images and animated stickers per sender
//! - [`hourly`]: messages per hour of day (chart)
//! - [`language`]: part-of-speech distribution (chart) and word cloud
//!
//! ## Adding Analyzers
//!
//! 1. Implement [`Analyzer`](super::Analyzer) and expose an
//!    [`AnalyzerKind`](super::AnalyzerKind) constant for it
//! 2. Add the kind to [`register_builtin`], or call
//!    [`registry::register`](super::registry::register) at startup
//!
//! Registration order is report section order.

pub mod activity;
pub mod hourly;
pub mod language;
pub mod media;

use super::registry::AnalyzerRegistry;

/// Register every built-in analyzer, in report order.
pub fn register_builtin(registry: &mut AnalyzerRegistry) {
    registry.register(activity::SENDER_ACTIVITY);
    registry.register(activity::LONGEST_MESSAGE);
    registry.register(media::IMAGE_COUNT);
    registry.register(media::EMOTICON_COUNT);
    registry.register(hourly::HOURLY_ACTIVITY);
    registry.register(language::PART_OF_SPEECH);
    registry.register(language::WORD_CLOUD);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration_is_idempotent() {
        let mut registry = AnalyzerRegistry::new();
        register_builtin(&mut registry);
        register_builtin(&mut registry);

        assert_eq!(registry.len(), 7, "Each built-in should appear once");
        assert_eq!(registry.ids()[0], "core.sender_activity");
        assert_eq!(registry.ids()[6], "core.word_cloud");
    }
}

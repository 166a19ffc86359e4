//! Analyzer registry for discovery.
//!
//! Every analyzer kind is listed here once, at startup. The order kinds are
//! registered in is the order sections appear in a report.

use super::engine::{Analyzer, AnalyzerContext};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Builds one analyzer instance bound to a group.
pub type AnalyzerFactory = fn(&AnalyzerContext) -> Box<dyn Analyzer>;

/// A registrable analyzer type.
#[derive(Clone, Copy)]
pub struct AnalyzerKind {
    /// Unique id. Convention: `namespace.analyzer_name` (e.g., "core.sender_activity")
    pub id: &'static str,
    pub build: AnalyzerFactory,
}

impl std::fmt::Debug for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerKind").field("id", &self.id).finish()
    }
}

/// Ordered, duplicate-free list of analyzer kinds.
#[derive(Debug, Default, Clone)]
pub struct AnalyzerRegistry {
    kinds: Vec<AnalyzerKind>,
}

impl AnalyzerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Register a kind. Returns false if a kind with the same id is already present.
    pub fn register(&mut self, kind: AnalyzerKind) -> bool {
        if self.contains(kind.id) {
            return false;
        }
        tracing::debug!(analyzer = kind.id, "Registered analyzer");
        self.kinds.push(kind);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.kinds.iter().any(|k| k.id == id)
    }

    /// Registered kinds, in registration order.
    pub fn list(&self) -> Vec<AnalyzerKind> {
        self.kinds.clone()
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.id).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Remove every kind (test hook).
    pub fn clear(&mut self) {
        self.kinds.clear();
    }

    /// One fresh instance of every registered kind, in order.
    pub fn build_all(&self, ctx: &AnalyzerContext) -> Vec<Box<dyn Analyzer>> {
        self.kinds.iter().map(|k| (k.build)(ctx)).collect()
    }
}

static GLOBAL: OnceLock<Mutex<AnalyzerRegistry>> = OnceLock::new();

/// The process-wide registry, populated with the built-in analyzers on first use.
pub fn global() -> MutexGuard<'static, AnalyzerRegistry> {
    GLOBAL
        .get_or_init(|| {
            let mut registry = AnalyzerRegistry::new();
            super::plugins::register_builtin(&mut registry);
            Mutex::new(registry)
        })
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Register a kind in the process-wide registry.
pub fn register(kind: AnalyzerKind) -> bool {
    global().register(kind)
}

/// Kinds in the process-wide registry, in registration order.
pub fn registered() -> Vec<AnalyzerKind> {
    global().list()
}

/// Empty the process-wide registry (test hook).
pub fn clear_registry() {
    global().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::plugins;

    #[test]
    fn test_register_is_idempotent_and_ordered() {
        let mut registry = AnalyzerRegistry::new();
        assert!(registry.register(plugins::activity::SENDER_ACTIVITY));
        assert!(registry.register(plugins::hourly::HOURLY_ACTIVITY));
        assert!(!registry.register(plugins::activity::SENDER_ACTIVITY));

        assert_eq!(
            registry.ids(),
            vec!["core.sender_activity", "core.hourly_activity"]
        );

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_global_registry_has_builtins_in_report_order() {
        let ids: Vec<&str> = registered().iter().map(|k| k.id).collect();
        assert_eq!(
            ids,
            vec![
                "core.sender_activity",
                "core.longest_message",
                "core.image_count",
                "core.emoticon_count",
                "core.hourly_activity",
                "core.part_of_speech",
                "core.word_cloud",
            ]
        );
        assert!(!register(plugins::media::IMAGE_COUNT));
    }
}

//! Answer cache keyed by question and answering mode.
//!
//! Entries are written once per key and only ever dropped in bulk through
//! [`ResponseCache::clear`].

use crate::models::ChatMode;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    question: String,
    mode: ChatMode,
}

impl CacheKey {
    /// Questions that differ only in case or surrounding whitespace share a key.
    pub fn new(question: &str, mode: ChatMode) -> Self {
        Self {
            question: question.trim().to_lowercase(),
            mode,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }
}

pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<String>;

    /// Stores `answer` unless the key already has one.
    fn insert(&self, key: CacheKey, answer: String);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-process cache.
#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, answer: String) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        debug!(question = key.question(), mode = key.mode().as_str(), "caching answer");
        entries.entry(key).or_insert(answer);
    }

    fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len();
        entries.clear();
        if removed > 0 {
            debug!(removed, "response cache cleared");
        }
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(
            CacheKey::new("  Donde vive el Colibri?  ", ChatMode::Strict),
            CacheKey::new("donde vive el colibri?", ChatMode::Strict)
        );
        assert_ne!(
            CacheKey::new("donde vive el colibri?", ChatMode::Strict),
            CacheKey::new("donde vive el colibri?", ChatMode::Investigative)
        );
    }

    #[test]
    fn entries_are_write_once() {
        let cache = MemoryResponseCache::new();
        let key = CacheKey::new("pregunta", ChatMode::Strict);

        cache.insert(key.clone(), "primera".to_string());
        cache.insert(key.clone(), "segunda".to_string());

        assert_eq!(cache.get(&key).as_deref(), Some("primera"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let cache = MemoryResponseCache::new();
        cache.insert(CacheKey::new("a", ChatMode::Strict), "uno".to_string());
        cache.insert(CacheKey::new("b", ChatMode::Investigative), "dos".to_string());

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get(&CacheKey::new("a", ChatMode::Strict)), None);
    }
}

//! # Match Cache Module
//!
//! Per-node-pool memo of instance type name -> resolved outcome.
//!
//! Key features:
//! - Explicit tri-state: absent, `CachedMatch::NoMatch`, `CachedMatch::Matched`
//! - One mutex-guarded segment per node pool
//! - Entries are never evicted or invalidated
//!
//! # Thread Safety
//! - The pool map is behind an RwLock, taken only to fetch or create a segment
//! - Lookup, evaluation and store for a name all happen under the segment mutex,
//!   so each (pool, name) pair is evaluated at most once

use crate::rule::Rule;
use crate::types::NodePoolKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

// ================================================================================================
// CACHED OUTCOME
// ================================================================================================

/// A resolved outcome. Absence from the cache means "never resolved".
#[derive(Debug, Clone)]
pub enum CachedMatch {
    /// Resolved, and no rule applies
    NoMatch,
    /// Resolved to this rule
    Matched(Arc<Rule>),
}

impl CachedMatch {
    fn from_outcome(outcome: Option<Arc<Rule>>) -> Self {
        match outcome {
            Some(rule) => CachedMatch::Matched(rule),
            None => CachedMatch::NoMatch,
        }
    }

    pub fn rule(&self) -> Option<&Arc<Rule>> {
        match self {
            CachedMatch::Matched(rule) => Some(rule),
            CachedMatch::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, CachedMatch::Matched(_))
    }
}

// ================================================================================================
// POOL SEGMENT
// ================================================================================================

/// Cached outcomes for a single node pool
#[derive(Debug, Default)]
pub struct PoolCache {
    entries: HashMap<String, CachedMatch>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance_type_name: &str) -> Option<&CachedMatch> {
        self.entries.get(instance_type_name)
    }

    /// Returns the cached outcome for `instance_type_name`, or runs `evaluate`
    /// once and caches whatever it returns, including no match.
    pub fn resolve_with<F>(&mut self, instance_type_name: &str, evaluate: F) -> Option<Arc<Rule>>
    where
        F: FnOnce() -> Option<Arc<Rule>>,
    {
        if let Some(cached) = self.entries.get(instance_type_name) {
            return cached.rule().map(Arc::clone);
        }

        let outcome = evaluate();
        self.entries.insert(
            instance_type_name.to_string(),
            CachedMatch::from_outcome(outcome.clone()),
        );
        outcome
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn matched_count(&self) -> usize {
        self.entries.values().filter(|m| m.is_match()).count()
    }
}

// ================================================================================================
// MATCH CACHE
// ================================================================================================

/// Cache of resolved outcomes for every node pool seen so far
#[derive(Debug, Default)]
pub struct MatchCache {
    pools: RwLock<HashMap<NodePoolKey, Arc<Mutex<PoolCache>>>>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the segment for `key`, creating an empty one if needed
    pub(crate) fn segment(&self, key: &NodePoolKey) -> Arc<Mutex<PoolCache>> {
        if let Some(segment) = self.pools.read().get(key) {
            return Arc::clone(segment);
        }

        let mut pools = self.pools.write();
        Arc::clone(pools.entry(key.clone()).or_default())
    }

    /// Returns the segment for `key` if one was ever created
    pub(crate) fn existing_segment(&self, key: &NodePoolKey) -> Option<Arc<Mutex<PoolCache>>> {
        self.pools.read().get(key).map(Arc::clone)
    }

    /// Whether any outcome has been cached for this pool
    pub fn has_entries(&self, key: &NodePoolKey) -> bool {
        match self.existing_segment(key) {
            Some(segment) => {
                let empty = segment.lock().is_empty();
                !empty
            }
            None => false,
        }
    }

    /// Cached outcome for a pair; `None` when never resolved
    pub fn get(&self, key: &NodePoolKey, instance_type_name: &str) -> Option<CachedMatch> {
        let segment = self.existing_segment(key)?;
        let cached = segment.lock().get(instance_type_name).cloned();
        cached
    }

    /// Cache-or-evaluate for a single pair
    pub fn resolve_with<F>(
        &self,
        key: &NodePoolKey,
        instance_type_name: &str,
        evaluate: F,
    ) -> Option<Arc<Rule>>
    where
        F: FnOnce() -> Option<Arc<Rule>>,
    {
        let segment = self.segment(key);
        let outcome = segment.lock().resolve_with(instance_type_name, evaluate);
        outcome
    }

    pub fn stats(&self) -> CacheStats {
        let segments: Vec<_> = self.pools.read().values().map(Arc::clone).collect();

        let mut stats = CacheStats {
            pools: segments.len(),
            ..CacheStats::default()
        };
        for segment in segments {
            let segment = segment.lock();
            let matched = segment.matched_count();
            stats.entries += segment.len();
            stats.matches += matched;
            stats.misses += segment.len() - matched;
        }
        stats
    }
}

/// Cache-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of pool segments
    pub pools: usize,
    /// Total cached pairs
    pub entries: usize,
    /// Pairs cached as a rule
    pub matches: usize,
    /// Pairs cached as no match
    pub misses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionSpec;
    use std::cell::Cell;

    fn rule(pattern: &str) -> Arc<Rule> {
        Arc::new(Rule::compile(0, &ExtensionSpec::new(pattern)).unwrap())
    }

    #[test]
    fn test_absent_until_resolved() {
        let cache = MatchCache::new();
        let key = NodePoolKey::new("pool", "default");

        assert!(cache.get(&key, "m5.large").is_none());
        assert!(!cache.has_entries(&key));
    }

    #[test]
    fn test_no_match_is_cached() {
        let cache = MatchCache::new();
        let key = NodePoolKey::new("pool", "default");

        assert!(cache.resolve_with(&key, "m5.large", || None).is_none());
        assert!(matches!(cache.get(&key, "m5.large"), Some(CachedMatch::NoMatch)));

        // A later evaluator that would match is never consulted
        let later = cache.resolve_with(&key, "m5.large", || Some(rule("m5")));
        assert!(later.is_none());
    }

    #[test]
    fn test_evaluates_at_most_once() {
        let mut segment = PoolCache::new();
        let calls = Cell::new(0);
        let r = rule("p3");

        for _ in 0..3 {
            let got = segment.resolve_with("p3.2xlarge", || {
                calls.set(calls.get() + 1);
                Some(Arc::clone(&r))
            });
            assert!(got.is_some());
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn test_pools_are_independent() {
        let cache = MatchCache::new();
        let a = NodePoolKey::new("a", "default");
        let b = NodePoolKey::new("b", "default");

        cache.resolve_with(&a, "p3.2xlarge", || None);
        let got = cache.resolve_with(&b, "p3.2xlarge", || Some(rule("p3")));

        assert!(got.is_some());
        assert!(!cache.get(&a, "p3.2xlarge").unwrap().is_match());
        assert!(cache.get(&b, "p3.2xlarge").unwrap().is_match());
    }

    #[test]
    fn test_stats_counts_matches_and_misses() {
        let cache = MatchCache::new();
        let key = NodePoolKey::new("pool", "default");

        cache.resolve_with(&key, "p3.2xlarge", || Some(rule("p3")));
        cache.resolve_with(&key, "m5.large", || None);
        cache.resolve_with(&key, "c5.large", || None);

        assert_eq!(
            cache.stats(),
            CacheStats {
                pools: 1,
                entries: 3,
                matches: 1,
                misses: 2,
            }
        );
    }

    #[test]
    fn test_segment_is_shared() {
        let cache = MatchCache::new();
        let key = NodePoolKey::new("pool", "default");

        let first = cache.segment(&key);
        let second = cache.segment(&key);
        assert!(Arc::ptr_eq(&first, &second));
    }
}

use crate::extension::ExtensionSpec;
use crate::loader::{load_rules, ExtenderConfig};
use crate::match_cache::{CachedMatch, MatchCache};
use crate::matcher::Matcher;
use crate::merger::ResourceMerger;
use crate::rule::{Rule, RuleCompiler};
use crate::types::{InstanceTypeView, NodePoolKey, NodePoolView};
use log::debug;
use std::sync::{Arc, OnceLock};

// ================================================================================================
// EXTENDER STRUCTURE
// ================================================================================================

/// Adds configured extended resources to candidate instance types, per node pool.
///
/// The rule list is fixed at construction. Outcomes are cached per
/// (node pool, instance type name) for the lifetime of the extender, including
/// "no match" outcomes. Cached outcomes are not revisited when a pool's labels
/// change later.
///
/// Share one instance between provisioning loops with `Arc`; concurrent
/// `extend_all` calls for the same pool are serialized by that pool's cache segment.
#[derive(Debug, Default)]
pub struct InstanceTypeExtender {
    matcher: Matcher,
    cache: MatchCache,
}

impl InstanceTypeExtender {
    /// Loads rules from the configured file. Never fails; a bad file yields zero rules.
    pub fn from_config(config: &ExtenderConfig) -> Self {
        Self::from_rules(load_rules(config).rules)
    }

    /// Creates an extender over already compiled rules, in evaluation order.
    pub fn from_rules(rules: Vec<Arc<Rule>>) -> Self {
        InstanceTypeExtender {
            matcher: Matcher::new(rules),
            cache: MatchCache::new(),
        }
    }

    /// Compiles `specs` and keeps the valid ones.
    pub fn from_specs(specs: &[ExtensionSpec]) -> Self {
        Self::from_rules(RuleCompiler::compile(specs).rules)
    }

    // ============================================================================================
    // ACCESSORS
    // ============================================================================================

    /// Returns the number of usable rules
    pub fn rule_count(&self) -> usize {
        self.matcher.len()
    }

    /// Returns the rules in evaluation order
    pub fn rules(&self) -> &[Arc<Rule>] {
        self.matcher.rules()
    }

    /// Cached outcome for a pair, `None` if it was never resolved
    pub fn cached_outcome(&self, key: &NodePoolKey, instance_type_name: &str) -> Option<CachedMatch> {
        self.cache.get(key, instance_type_name)
    }

    // ============================================================================================
    // RESOLUTION
    // ============================================================================================

    /// Returns the rule that applies to `instance_type_name` in `node_pool`.
    ///
    /// The first call for a pair scans the rules; every later call returns the
    /// cached outcome.
    pub fn resolve<P: NodePoolView + ?Sized>(
        &self,
        node_pool: &P,
        instance_type_name: &str,
    ) -> Option<Arc<Rule>> {
        let key = node_pool.key();
        self.cache.resolve_with(&key, instance_type_name, || {
            self.evaluate(&key, node_pool, instance_type_name)
        })
    }

    /// Adds extended resources to every candidate that resolves to a rule.
    ///
    /// No-op when the pool is absent, there are no candidates, or there are no
    /// rules and nothing cached for the pool. Candidates are handled in order and
    /// independently of each other.
    pub fn extend_all<P, I>(&self, node_pool: Option<&P>, candidates: &mut [I])
    where
        P: NodePoolView + ?Sized,
        I: InstanceTypeView,
    {
        let Some(node_pool) = node_pool else {
            return;
        };
        if candidates.is_empty() {
            return;
        }

        let key = node_pool.key();
        if self.matcher.is_empty() && !self.cache.has_entries(&key) {
            return;
        }

        let segment = self.cache.segment(&key);
        let mut pool_cache = segment.lock();

        for candidate in candidates.iter_mut() {
            let outcome = pool_cache.resolve_with(candidate.name(), || {
                self.evaluate(&key, node_pool, candidate.name())
            });

            if let Some(rule) = outcome {
                ResourceMerger::apply(candidate, &rule);
            }
        }
    }

    fn evaluate<P: NodePoolView + ?Sized>(
        &self,
        key: &NodePoolKey,
        node_pool: &P,
        instance_type_name: &str,
    ) -> Option<Arc<Rule>> {
        let outcome = self.matcher.find(node_pool, instance_type_name);
        match &outcome {
            Some(rule) => debug!(
                "Instance type {} in node pool {} resolved to extension rule {}",
                instance_type_name,
                key,
                rule.index()
            ),
            None => debug!(
                "Instance type {} in node pool {} has no extension rule",
                instance_type_name, key
            ),
        }
        outcome
    }

    // ============================================================================================
    // STATISTICS & MONITORING
    // ============================================================================================

    /// Returns statistics about the extender
    pub fn stats(&self) -> ExtenderStats {
        let cache = self.cache.stats();
        ExtenderStats {
            rule_count: self.rule_count(),
            cached_pools: cache.pools,
            cached_entries: cache.entries,
            cached_matches: cache.matches,
            cached_misses: cache.misses,
        }
    }
}

/// Extender-level statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtenderStats {
    /// Number of usable rules
    pub rule_count: usize,
    /// Node pools with a cache segment
    pub cached_pools: usize,
    /// Total cached (pool, instance type) pairs
    pub cached_entries: usize,
    /// Pairs cached as a rule
    pub cached_matches: usize,
    /// Pairs cached as no match
    pub cached_misses: usize,
}

// ================================================================================================
// LAZY CONSTRUCTION
// ================================================================================================

/// Builds the extender on first use, exactly once.
///
/// Concurrent first callers block until configuration has been loaded, then all
/// of them get the same instance.
#[derive(Debug)]
pub struct LazyExtender {
    config: ExtenderConfig,
    extender: OnceLock<Arc<InstanceTypeExtender>>,
}

impl LazyExtender {
    pub fn new(config: ExtenderConfig) -> Self {
        LazyExtender {
            config,
            extender: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Arc<InstanceTypeExtender> {
        Arc::clone(
            self.extender
                .get_or_init(|| Arc::new(InstanceTypeExtender::from_config(&self.config))),
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.extender.get().is_some()
    }

    pub fn config(&self) -> &ExtenderConfig {
        &self.config
    }
}

impl Default for LazyExtender {
    fn default() -> Self {
        Self::new(ExtenderConfig::from_env())
    }
}

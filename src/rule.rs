// Compile raw extension specs into immutable rules.
//
// A spec whose pattern does not compile is skipped and reported; the remaining
// specs still load, in declaration order.

use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use crate::extension::ExtensionSpec;
use crate::types::{Labels, NodePoolView, ResourceList};

/// Compiled, immutable extension rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Position of the spec in the configuration
    index: usize,
    pattern: Regex,
    required_labels: Labels,
    extended_resources: ResourceList,
}

impl Rule {
    /// Compile a single spec. `index` is its declaration position.
    pub fn compile(index: usize, spec: &ExtensionSpec) -> Result<Self, CompileError> {
        let pattern =
            Regex::new(&spec.instance_name_regex).map_err(|source| CompileError::InvalidPattern {
                index,
                pattern: spec.instance_name_regex.clone(),
                source,
            })?;

        Ok(Rule {
            index,
            pattern,
            required_labels: spec.required_node_pool_labels.clone(),
            extended_resources: spec.extended_resources.clone(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn required_labels(&self) -> &Labels {
        &self.required_labels
    }

    pub fn extended_resources(&self) -> &ResourceList {
        &self.extended_resources
    }

    /// Unanchored search: the pattern may match anywhere in the name
    pub fn matches_name(&self, instance_type_name: &str) -> bool {
        self.pattern.is_match(instance_type_name)
    }

    /// Every required label must be present on the pool with an identical value
    pub fn labels_satisfied<P: NodePoolView + ?Sized>(&self, node_pool: &P) -> bool {
        self.required_labels
            .iter()
            .all(|(key, value)| node_pool.label(key) == Some(value.as_str()))
    }
}

/// Output of a compilation pass
#[derive(Debug, Default)]
pub struct CompileReport {
    /// Usable rules, in declaration order
    pub rules: Vec<Arc<Rule>>,
    /// Specs that were dropped
    pub skipped: Vec<CompileError>,
}

/// Rule compiler
pub struct RuleCompiler;

impl RuleCompiler {
    /// Compile all specs, keeping the ones that compile
    pub fn compile(specs: &[ExtensionSpec]) -> CompileReport {
        let mut report = CompileReport::default();

        for (index, spec) in specs.iter().enumerate() {
            match Rule::compile(index, spec) {
                Ok(rule) => report.rules.push(Arc::new(rule)),
                Err(e) => {
                    log::error!("Skipping extension rule: {}", e);
                    report.skipped.push(e);
                }
            }
        }

        report
    }
}

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("rule {index}: failed to compile instance name pattern {pattern:?}: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodePool;

    #[test]
    fn test_invalid_pattern_is_skipped_not_fatal() {
        let specs = vec![
            ExtensionSpec::new("^g4dn").with_resource("vendor.com/fpga", 2),
            ExtensionSpec::new("p3[").with_resource("nvidia.com/gpu", 1),
            ExtensionSpec::new("m5").with_resource("example.com/foo", 1),
        ];

        let report = RuleCompiler::compile(&specs);
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.skipped.len(), 1);

        // Declaration order and original positions survive
        assert_eq!(report.rules[0].index(), 0);
        assert_eq!(report.rules[1].index(), 2);
        assert_eq!(report.rules[1].pattern(), "m5");

        match &report.skipped[0] {
            CompileError::InvalidPattern { index, pattern, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(pattern, "p3[");
            }
        }
    }

    #[test]
    fn test_substring_match() {
        let rule = Rule::compile(0, &ExtensionSpec::new("p3")).unwrap();
        assert!(rule.matches_name("p3.2xlarge"));
        assert!(rule.matches_name("big-p3-node"));
        assert!(!rule.matches_name("m5.large"));
    }

    #[test]
    fn test_anchored_pattern_respected() {
        let rule = Rule::compile(0, &ExtensionSpec::new("^g4dn")).unwrap();
        assert!(rule.matches_name("g4dn.xlarge"));
        assert!(!rule.matches_name("x-g4dn"));
    }

    #[test]
    fn test_label_gate_is_exact_and_of_all_keys() {
        let rule = Rule::compile(
            0,
            &ExtensionSpec::new("p3")
                .with_label("zone", "us-east-1a")
                .with_label("tier", "gpu"),
        )
        .unwrap();

        let both = NodePool::new("a", "ns")
            .with_label("zone", "us-east-1a")
            .with_label("tier", "gpu");
        let one = NodePool::new("b", "ns").with_label("zone", "us-east-1a");
        let wrong = NodePool::new("c", "ns")
            .with_label("zone", "us-west-2b")
            .with_label("tier", "gpu");

        assert!(rule.labels_satisfied(&both));
        assert!(!rule.labels_satisfied(&one));
        assert!(!rule.labels_satisfied(&wrong));
    }

    #[test]
    fn test_empty_value_label_still_requires_presence() {
        let rule = Rule::compile(0, &ExtensionSpec::new("p3").with_label("flag", "")).unwrap();
        assert!(!rule.labels_satisfied(&NodePool::new("a", "ns")));
        assert!(rule.labels_satisfied(&NodePool::new("a", "ns").with_label("flag", "")));
    }

    #[test]
    fn test_no_required_labels_always_pass() {
        let rule = Rule::compile(0, &ExtensionSpec::new("p3")).unwrap();
        assert!(rule.labels_satisfied(&NodePool::new("a", "ns")));
    }
}

//! # Matcher Module
//!
//! Evaluates the ordered rule list against one instance type name and a node pool.
//!
//! Rules are tried in declaration order. A rule wins when its pattern matches the
//! name and its label gate passes. A name match with a failing label gate does not
//! stop the scan.

use std::sync::Arc;

use crate::rule::Rule;
use crate::types::NodePoolView;

/// Ordered first-match-wins evaluator over an immutable rule list
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    rules: Vec<Arc<Rule>>,
}

impl Matcher {
    pub fn new(rules: Vec<Arc<Rule>>) -> Self {
        Matcher { rules }
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns the first rule matching `instance_type_name` whose label gate passes
    pub fn find<P: NodePoolView + ?Sized>(
        &self,
        node_pool: &P,
        instance_type_name: &str,
    ) -> Option<Arc<Rule>> {
        self.rules
            .iter()
            .filter(|rule| rule.matches_name(instance_type_name))
            .find(|rule| rule.labels_satisfied(node_pool))
            .map(Arc::clone)
    }
}

//! Writes a rule's extended resources into an instance type's capacity.

use crate::rule::Rule;
use crate::types::InstanceTypeView;

pub struct ResourceMerger;

impl ResourceMerger {
    /// Sets every extended resource of `rule` on `instance_type`.
    ///
    /// Existing entries with the same name are overwritten, not added to.
    pub fn apply<I: InstanceTypeView + ?Sized>(instance_type: &mut I, rule: &Rule) {
        for (resource, quantity) in rule.extended_resources() {
            instance_type.set_capacity(resource, *quantity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionSpec;
    use crate::types::InstanceType;

    #[test]
    fn test_overwrites_existing_quantity() {
        let rule = Rule::compile(0, &ExtensionSpec::new("p3").with_resource("nvidia.com/gpu", 4))
            .unwrap();
        let mut it = InstanceType::new("p3.2xlarge").with_capacity("nvidia.com/gpu", 1);

        ResourceMerger::apply(&mut it, &rule);
        assert_eq!(it.capacity.get("nvidia.com/gpu"), Some(&4));
    }

    #[test]
    fn test_leaves_other_entries_alone() {
        let rule = Rule::compile(0, &ExtensionSpec::new("^g4dn").with_resource("vendor.com/fpga", 2))
            .unwrap();
        let mut it = InstanceType::new("g4dn.xlarge").with_capacity("cpu", 4);

        ResourceMerger::apply(&mut it, &rule);

        let expected = InstanceType::new("g4dn.xlarge")
            .with_capacity("cpu", 4)
            .with_capacity("vendor.com/fpga", 2);
        assert_eq!(it, expected);
    }

    #[test]
    fn test_applying_twice_is_idempotent() {
        let rule = Rule::compile(0, &ExtensionSpec::new("p3").with_resource("nvidia.com/gpu", 4))
            .unwrap();
        let mut it = InstanceType::new("p3.2xlarge");

        ResourceMerger::apply(&mut it, &rule);
        let once = it.clone();
        ResourceMerger::apply(&mut it, &rule);
        assert_eq!(it, once);
    }
}

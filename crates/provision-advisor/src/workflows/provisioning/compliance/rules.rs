use std::fmt;

use super::super::domain::ResourceRequest;

const OPEN_WORLD_CIDR: &str = "0.0.0.0/0";
const OVERSIZED_DEV_INSTANCES: [&str; 2] = ["large", "xlarge"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleCategory {
    Security,
    Cost,
}

/// One scoring rule. A violated rule deducts `deduction` and records `message`.
#[derive(Clone, Copy)]
pub(crate) struct ComplianceRule {
    pub category: RuleCategory,
    pub deduction: u8,
    pub message: &'static str,
    pub violated: fn(&ResourceRequest) -> bool,
}

impl fmt::Debug for ComplianceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceRule")
            .field("category", &self.category)
            .field("deduction", &self.deduction)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Evaluation order is the order of this table.
pub(crate) const STANDARD_RULES: [ComplianceRule; 3] = [
    ComplianceRule {
        category: RuleCategory::Security,
        deduction: 30,
        message: "[Security] Resource is not encrypted.",
        violated: unencrypted,
    },
    ComplianceRule {
        category: RuleCategory::Security,
        deduction: 40,
        message: "[Security] Port open to the world (0.0.0.0/0).",
        violated: open_to_world,
    },
    ComplianceRule {
        category: RuleCategory::Cost,
        deduction: 20,
        message: "[Cost] Use 'micro' or 'small' for Dev environments.",
        violated: oversized_dev_instance,
    },
];

fn unencrypted(resource: &ResourceRequest) -> bool {
    !resource.encrypted
}

fn open_to_world(resource: &ResourceRequest) -> bool {
    resource
        .security_group
        .allowed_cidrs
        .iter()
        .any(|cidr| cidr == OPEN_WORLD_CIDR)
}

fn oversized_dev_instance(resource: &ResourceRequest) -> bool {
    resource.environment == "dev"
        && OVERSIZED_DEV_INSTANCES.contains(&resource.instance_type.as_str())
}

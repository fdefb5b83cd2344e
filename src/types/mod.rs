mod condition;
mod criteria;
mod decision;
mod error;
mod protocol;
mod registry;
mod rule;
mod wire;

pub use condition::{Condition, ConditionFactory};
pub(crate) use condition::is_reserved_rule_name;
pub use criteria::Criteria;
pub use decision::{AuthorizeQuery, ConditionalDecision, PermissionPolicy, PolicyDecision};
pub use error::RuleError;
pub use protocol::{
    ApplyConditionsRequest, ApplyConditionsResponse, ErrorDetail, ErrorResponse,
    ResolveFiltersRequest, APPLY_CONDITIONS_PATH, RESOLVE_FILTERS_PATH,
};
pub use registry::{RuleRegistry, RuleRegistryBuilder};
pub use rule::{ErasedRule, PermissionRule, RuleDescription};

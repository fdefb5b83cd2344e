use serde::{Deserialize, Serialize};
use tracing::warn;

use super::condition::Condition;
use super::criteria::Criteria;
use super::registry::RuleRegistry;

/// Criteria a policy hands back when it cannot decide without the resource,
/// addressed to the plugin that owns resources of `resource_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalDecision {
    pub plugin_id: String,
    pub resource_type: String,
    pub conditions: Criteria<Condition>,
}

/// Outcome of a permission policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyDecision {
    Allow,
    Deny,
    Conditional(ConditionalDecision),
}

impl PolicyDecision {
    /// Settle the decision for a resource that is already at hand.
    ///
    /// Conditional decisions are evaluated with `registry`. Any evaluation
    /// error denies.
    pub fn resolve_fail_closed<R, Q>(&self, registry: &RuleRegistry<R, Q>, resource: &R) -> bool {
        match self {
            PolicyDecision::Allow => true,
            PolicyDecision::Deny => false,
            PolicyDecision::Conditional(decision) => {
                match registry.apply(&decision.conditions, resource) {
                    Ok(allowed) => allowed,
                    Err(err) => {
                        warn!(
                            plugin_id = %decision.plugin_id,
                            resource_type = %decision.resource_type,
                            error = %err,
                            "conditional decision failed, denying"
                        );
                        false
                    }
                }
            }
        }
    }
}

/// What a policy is asked to decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeQuery {
    pub permission: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    /// Authenticated caller, if any.
    #[serde(default)]
    pub principal: Option<String>,
}

/// Decides ALLOW, DENY or CONDITIONAL for a caller and permission.
pub trait PermissionPolicy: Send + Sync {
    fn handle(&self, query: &AuthorizeQuery) -> PolicyDecision;
}

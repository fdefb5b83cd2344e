use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::condition::decode_params;
use super::error::RuleError;

/// A named predicate over a resource, paired with its lowering to a query fragment.
///
/// `apply` and `to_query` must agree: a resource matched by the query built
/// from `to_query(p)` must satisfy `apply(resource, p)`, and the reverse for
/// exact rules. A rule that can only narrow a query should say so in its
/// description. Neither method may panic on well-formed params.
///
/// `Params` is the positional parameter list. Tuples are the natural choice:
/// `(Vec<String>,)` travels as `[["a", "b"]]`, `()` as `[]`.
pub trait PermissionRule: Send + Sync + 'static {
    type Resource;
    type Query;
    type Params: Serialize + DeserializeOwned;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn apply(&self, resource: &Self::Resource, params: &Self::Params) -> bool;

    fn to_query(&self, params: &Self::Params) -> Self::Query;
}

/// Object-safe view of a [`PermissionRule`] working on wire params.
///
/// Every `PermissionRule` gets this for free; registries store rules as
/// `Arc<dyn ErasedRule<R, Q>>` so rules with different `Params` share one map.
pub trait ErasedRule<R, Q>: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// # Errors
    ///
    /// [`RuleError::InvalidParams`] if `params` do not decode.
    fn apply(&self, resource: &R, params: &[Value]) -> Result<bool, RuleError>;

    /// # Errors
    ///
    /// [`RuleError::InvalidParams`] if `params` do not decode.
    fn to_query(&self, params: &[Value]) -> Result<Q, RuleError>;

    /// # Errors
    ///
    /// [`RuleError::InvalidParams`] if `params` do not decode.
    fn check_params(&self, params: &[Value]) -> Result<(), RuleError>;
}

impl<T: PermissionRule> ErasedRule<T::Resource, T::Query> for T {
    fn name(&self) -> &str {
        PermissionRule::name(self)
    }

    fn description(&self) -> &str {
        PermissionRule::description(self)
    }

    fn apply(&self, resource: &T::Resource, params: &[Value]) -> Result<bool, RuleError> {
        let params = typed_params::<T>(self, params)?;
        Ok(PermissionRule::apply(self, resource, &params))
    }

    fn to_query(&self, params: &[Value]) -> Result<T::Query, RuleError> {
        let params = typed_params::<T>(self, params)?;
        Ok(PermissionRule::to_query(self, &params))
    }

    fn check_params(&self, params: &[Value]) -> Result<(), RuleError> {
        typed_params::<T>(self, params).map(|_| ())
    }
}

fn typed_params<T: PermissionRule>(rule: &T, params: &[Value]) -> Result<T::Params, RuleError> {
    decode_params(params).map_err(|err| RuleError::InvalidParams {
        rule: PermissionRule::name(rule).to_owned(),
        message: err.to_string(),
    })
}

/// Name and description of a registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescription {
    pub name: String,
    pub description: String,
}

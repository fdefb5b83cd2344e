use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RuleError;
use super::rule::PermissionRule;

/// A bound rule invocation: a rule name plus its positional JSON parameters.
///
/// Conditions are produced by a [`ConditionFactory`] and travel between
/// services inside a [`Criteria`](super::Criteria) tree. Parameter types are
/// not checked here; a mismatch surfaces when the receiving registry
/// interprets the condition.
///
/// `all` and `any` are not valid rule names: the text form spells empty
/// groups that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct Condition {
    rule: String,
    params: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCondition {
    rule: String,
    #[serde(default)]
    params: Vec<Value>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = RuleError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        check_rule_name(&raw.rule)?;
        Ok(Condition::new(raw.rule, raw.params))
    }
}

/// Rule names that would read back as empty groups in the text form.
pub(crate) fn is_reserved_rule_name(name: &str) -> bool {
    matches!(name, "all" | "any")
}

pub(crate) fn check_rule_name(name: &str) -> Result<(), RuleError> {
    if is_reserved_rule_name(name) {
        return Err(RuleError::ReservedName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

impl Condition {
    pub(crate) fn new(rule: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            rule: rule.into(),
            params,
        }
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.rule)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Typed constructor for conditions of one rule.
///
/// Returned by [`RuleRegistryBuilder::register`](super::RuleRegistryBuilder::register)
/// and [`RuleRegistry::extend`](super::RuleRegistry::extend), so call sites bind
/// parameters of the rule's own `Params` type instead of hand-writing names.
pub struct ConditionFactory<R: PermissionRule> {
    name: String,
    _params: PhantomData<fn(R::Params)>,
}

impl<R: PermissionRule> ConditionFactory<R> {
    #[must_use]
    pub fn of(rule: &R) -> Self {
        Self {
            name: rule.name().to_owned(),
            _params: PhantomData,
        }
    }

    #[must_use]
    pub fn rule_name(&self) -> &str {
        &self.name
    }

    /// Bind `params` into a condition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidParams`] if `params` cannot be encoded as
    /// JSON, or [`RuleError::ReservedName`] if the rule is named `all` or `any`.
    pub fn try_bind(&self, params: R::Params) -> Result<Condition, RuleError> {
        check_rule_name(&self.name)?;
        let params = encode_params(&params).map_err(|err| RuleError::InvalidParams {
            rule: self.name.clone(),
            message: err.to_string(),
        })?;
        Ok(Condition::new(self.name.clone(), params))
    }

    /// Bind `params` into a condition.
    ///
    /// # Panics
    ///
    /// Panics where [`try_bind`](Self::try_bind) fails. `serde_json` only
    /// reports encoding errors for maps with non-string keys or failing custom
    /// `Serialize` impls, and a reserved rule name cannot be registered.
    #[must_use]
    pub fn bind(&self, params: R::Params) -> Condition {
        match self.try_bind(params) {
            Ok(condition) => condition,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<R: PermissionRule> Clone for ConditionFactory<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _params: PhantomData,
        }
    }
}

impl<R: PermissionRule> fmt::Debug for ConditionFactory<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionFactory")
            .field("rule", &self.name)
            .finish()
    }
}

/// Encode typed params as the positional wire list.
///
/// A JSON array is used as-is, `null` (unit) becomes `[]`, and any other
/// value becomes a single positional parameter.
pub(crate) fn encode_params<P: Serialize>(params: &P) -> serde_json::Result<Vec<Value>> {
    Ok(match serde_json::to_value(params)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// Inverse of [`encode_params`].
///
/// The positional list is tried first. An empty or single-element list may
/// also be the unit or scalar form; that reading wins only when the list form
/// fails, or when it alone encodes back to the same list.
pub(crate) fn decode_params<P>(params: &[Value]) -> serde_json::Result<P>
where
    P: Serialize + DeserializeOwned,
{
    let positional = serde_json::from_value::<P>(Value::Array(params.to_vec()));
    let unwrapped = match params {
        [] => Value::Null,
        [single] => single.clone(),
        _ => return positional,
    };
    match positional {
        Ok(decoded) if encodes_to(&decoded, params) => Ok(decoded),
        Ok(decoded) => Ok(serde_json::from_value::<P>(unwrapped)
            .ok()
            .filter(|other| encodes_to(other, params))
            .unwrap_or(decoded)),
        Err(err) => serde_json::from_value(unwrapped).map_err(|_| err),
    }
}

fn encodes_to<P: Serialize>(decoded: &P, params: &[Value]) -> bool {
    encode_params(decoded).is_ok_and(|encoded| encoded == params)
}

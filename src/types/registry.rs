use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::condition::{check_rule_name, Condition, ConditionFactory};
use super::criteria::Criteria;
use super::error::RuleError;
use super::rule::{ErasedRule, PermissionRule, RuleDescription};

type SharedRule<R, Q> = Arc<dyn ErasedRule<R, Q>>;

/// Builder for a [`RuleRegistry`].
///
/// Rules are registered by trusted code at startup. Registration returns a
/// typed [`ConditionFactory`] for the rule; [`build`](Self::build) freezes the
/// set into an immutable registry.
///
/// # Example
///
/// ```
/// use ruleward::{Criteria, PermissionRule, RuleRegistryBuilder};
///
/// struct IsKind;
///
/// impl PermissionRule for IsKind {
///     type Resource = String;
///     type Query = String;
///     type Params = (Vec<String>,);
///
///     fn name(&self) -> &str { "IS_KIND" }
///     fn description(&self) -> &str { "Allow resources of the given kinds" }
///     fn apply(&self, kind: &String, (kinds,): &(Vec<String>,)) -> bool {
///         kinds.contains(kind)
///     }
///     fn to_query(&self, (kinds,): &(Vec<String>,)) -> String {
///         format!("kind IN {kinds:?}")
///     }
/// }
///
/// let mut builder = RuleRegistryBuilder::new();
/// let is_kind = builder.register(IsKind).unwrap();
/// let registry = builder.build();
///
/// let criteria = Criteria::leaf(is_kind.bind((vec!["template".to_owned()],)));
/// assert!(registry.apply(&criteria, &"template".to_owned()).unwrap());
/// ```
pub struct RuleRegistryBuilder<R, Q> {
    rules: BTreeMap<String, SharedRule<R, Q>>,
}

impl<R, Q> RuleRegistryBuilder<R, Q> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Register a rule and return its condition factory.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::DuplicateRule`] if a rule with the same name is
    /// already registered; the existing rule is kept. Returns
    /// [`RuleError::ReservedName`] for rules named `all` or `any`.
    pub fn register<T>(&mut self, rule: T) -> Result<ConditionFactory<T>, RuleError>
    where
        T: PermissionRule<Resource = R, Query = Q>,
    {
        let factory = ConditionFactory::of(&rule);
        self.register_erased(Arc::new(rule))?;
        Ok(factory)
    }

    /// Register an already type-erased rule, e.g. one handed over by a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::DuplicateRule`] if the name is taken, or
    /// [`RuleError::ReservedName`] if it is `all` or `any`.
    pub fn register_erased(&mut self, rule: SharedRule<R, Q>) -> Result<(), RuleError> {
        let name = rule.name().to_owned();
        check_rule_name(&name)?;
        if self.rules.contains_key(&name) {
            return Err(RuleError::DuplicateRule { name });
        }
        debug!(rule = %name, "registered permission rule");
        self.rules.insert(name, rule);
        Ok(())
    }

    /// Chaining form of [`register`](Self::register) for rules whose factory
    /// is not needed at the call site.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::DuplicateRule`] if the name is taken.
    pub fn with_rule<T>(mut self, rule: T) -> Result<Self, RuleError>
    where
        T: PermissionRule<Resource = R, Query = Q>,
    {
        self.register(rule)?;
        Ok(self)
    }

    /// Freeze the registered rules.
    #[must_use]
    pub fn build(self) -> RuleRegistry<R, Q> {
        RuleRegistry { rules: self.rules }
    }
}

impl<R, Q> Default for RuleRegistryBuilder<R, Q> {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable set of rules keyed by name. Thread-safe and designed to live behind `Arc`.
pub struct RuleRegistry<R, Q> {
    rules: BTreeMap<String, SharedRule<R, Q>>,
}

impl<R, Q> RuleRegistry<R, Q> {
    #[must_use]
    pub fn builder() -> RuleRegistryBuilder<R, Q> {
        RuleRegistryBuilder::new()
    }

    /// Create a new registry holding this registry's rules plus the ones
    /// registered by `f`.
    ///
    /// `self` is left untouched. Whatever `f` returns is handed back next to
    /// the new registry, which is how callers receive the condition factories
    /// of exactly the rules they added.
    ///
    /// # Errors
    ///
    /// Returns the first error `f` returns, typically
    /// [`RuleError::DuplicateRule`] when an added rule clashes with a base rule.
    pub fn extend<B, F>(&self, f: F) -> Result<(RuleRegistry<R, Q>, B), RuleError>
    where
        F: FnOnce(&mut RuleRegistryBuilder<R, Q>) -> Result<B, RuleError>,
    {
        let mut builder = RuleRegistryBuilder {
            rules: self.rules.clone(),
        };
        let added = f(&mut builder)?;
        Ok((builder.build(), added))
    }

    /// Look up a rule by name.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownRule`] if no rule has that name.
    pub fn resolve(&self, name: &str) -> Result<&dyn ErasedRule<R, Q>, RuleError> {
        self.rules
            .get(name)
            .map(|rule| rule.as_ref())
            .ok_or_else(|| RuleError::UnknownRule {
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered rule names, sorted.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Name and description of every registered rule, sorted by name.
    #[must_use]
    pub fn descriptions(&self) -> Vec<RuleDescription> {
        self.rules
            .values()
            .map(|rule| RuleDescription {
                name: rule.name().to_owned(),
                description: rule.description().to_owned(),
            })
            .collect()
    }

    /// Evaluate `criteria` against a concrete resource.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownRule`] or [`RuleError::InvalidParams`] for
    /// the first leaf reached that cannot be interpreted. An error is never
    /// turned into `true` or `false`.
    pub fn apply(&self, criteria: &Criteria<Condition>, resource: &R) -> Result<bool, RuleError> {
        crate::evaluate::apply(self, criteria, resource)
    }

    /// Lower `criteria` into a tree of query fragments with the same shape.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownRule`] or [`RuleError::InvalidParams`] for
    /// the first leaf that cannot be lowered.
    pub fn to_query(&self, criteria: &Criteria<Condition>) -> Result<Criteria<Q>, RuleError> {
        crate::evaluate::to_query(self, criteria)
    }

    /// Check that every leaf names a registered rule with decodable params,
    /// without touching any resource.
    ///
    /// # Errors
    ///
    /// Returns the error for the first offending leaf.
    pub fn validate(&self, criteria: &Criteria<Condition>) -> Result<(), RuleError> {
        crate::evaluate::validate(self, criteria)
    }

    /// Parse criteria DSL text and evaluate it against `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) for bad syntax and
    /// [`Error::Rule`](crate::Error::Rule) when interpretation fails.
    pub fn apply_dsl(&self, dsl: &str, resource: &R) -> Result<bool, crate::Error> {
        let criteria = Criteria::<Condition>::from_dsl(dsl)?;
        Ok(self.apply(&criteria, resource)?)
    }

    /// Parse criteria DSL text and lower it into query fragments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) for bad syntax and
    /// [`Error::Rule`](crate::Error::Rule) when lowering fails.
    pub fn to_query_dsl(&self, dsl: &str) -> Result<Criteria<Q>, crate::Error> {
        let criteria = Criteria::<Condition>::from_dsl(dsl)?;
        Ok(self.to_query(&criteria)?)
    }
}

impl<R, Q> Clone for RuleRegistry<R, Q> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<R, Q> fmt::Debug for RuleRegistry<R, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl<R, Q> fmt::Display for RuleRegistry<R, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleRegistry({} rules: {})", self.len(), self.rule_names().join(", "))
    }
}

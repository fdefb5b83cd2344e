use std::convert::Infallible;
use std::fmt;

use super::condition::Condition;

/// Boolean criteria tree over leaves of type `T`.
///
/// A decision-maker builds a `Criteria<Condition>`; lowering it through a
/// [`RuleRegistry`](super::RuleRegistry) yields a `Criteria<Q>` with the same
/// shape and query fragments at the leaves.
///
/// `Any` of nothing is `false`, `All` of nothing is `true`.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria<T> {
    Leaf(T),
    All(Vec<Criteria<T>>),
    Any(Vec<Criteria<T>>),
}

impl<T> Criteria<T> {
    #[must_use]
    pub fn leaf(value: T) -> Self {
        Criteria::Leaf(value)
    }

    #[must_use]
    pub fn all<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Criteria<T>>,
    {
        Criteria::All(children.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn any<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Criteria<T>>,
    {
        Criteria::Any(children.into_iter().map(Into::into).collect())
    }

    /// Conjoin with `other`, appending to an existing `All` instead of nesting.
    #[must_use]
    pub fn and(self, other: impl Into<Criteria<T>>) -> Self {
        match self {
            Criteria::All(mut children) => {
                children.push(other.into());
                Criteria::All(children)
            }
            first => Criteria::All(vec![first, other.into()]),
        }
    }

    /// Disjoin with `other`, appending to an existing `Any` instead of nesting.
    #[must_use]
    pub fn or(self, other: impl Into<Criteria<T>>) -> Self {
        match self {
            Criteria::Any(mut children) => {
                children.push(other.into());
                Criteria::Any(children)
            }
            first => Criteria::Any(vec![first, other.into()]),
        }
    }

    /// Evaluate the tree, deciding each leaf with `decide`.
    ///
    /// `Any` stops at the first `true` child and `All` at the first `false`
    /// one; children after that point are never visited. The first error
    /// aborts the walk.
    ///
    /// # Errors
    ///
    /// Returns whatever `decide` returns for the first failing leaf.
    pub fn try_evaluate<E, F>(&self, mut decide: F) -> Result<bool, E>
    where
        F: FnMut(&T) -> Result<bool, E>,
    {
        self.try_evaluate_with(&mut decide)
    }

    fn try_evaluate_with<E, F>(&self, decide: &mut F) -> Result<bool, E>
    where
        F: FnMut(&T) -> Result<bool, E>,
    {
        match self {
            Criteria::Leaf(value) => decide(value),
            Criteria::All(children) => {
                for child in children {
                    if !child.try_evaluate_with(decide)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Criteria::Any(children) => {
                for child in children {
                    if child.try_evaluate_with(decide)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Infallible form of [`try_evaluate`](Self::try_evaluate).
    pub fn evaluate<F>(&self, mut decide: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let result: Result<bool, Infallible> = self.try_evaluate(|value| Ok(decide(value)));
        match result {
            Ok(allowed) => allowed,
            Err(never) => match never {},
        }
    }

    /// Rebuild the tree with every leaf replaced by `lower(leaf)`.
    ///
    /// The result has exactly the same `All`/`Any` structure. The first
    /// error aborts the walk; no partial tree is returned.
    ///
    /// # Errors
    ///
    /// Returns whatever `lower` returns for the first failing leaf.
    pub fn try_map<U, E, F>(&self, mut lower: F) -> Result<Criteria<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        self.try_map_with(&mut lower)
    }

    fn try_map_with<U, E, F>(&self, lower: &mut F) -> Result<Criteria<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        Ok(match self {
            Criteria::Leaf(value) => Criteria::Leaf(lower(value)?),
            Criteria::All(children) => Criteria::All(
                children
                    .iter()
                    .map(|child| child.try_map_with(lower))
                    .collect::<Result<_, _>>()?,
            ),
            Criteria::Any(children) => Criteria::Any(
                children
                    .iter()
                    .map(|child| child.try_map_with(lower))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Infallible form of [`try_map`](Self::try_map).
    #[must_use]
    pub fn map<U, F>(&self, mut lower: F) -> Criteria<U>
    where
        F: FnMut(&T) -> U,
    {
        let result: Result<Criteria<U>, Infallible> = self.try_map(|value| Ok(lower(value)));
        match result {
            Ok(mapped) => mapped,
            Err(never) => match never {},
        }
    }

    /// All leaves in depth-first, left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Nesting depth; a bare leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Criteria::Leaf(_) => 0,
            Criteria::All(children) | Criteria::Any(children) => {
                1 + children.iter().map(Criteria::depth).max().unwrap_or(0)
            }
        }
    }
}

fn collect_leaves<'a, T>(criteria: &'a Criteria<T>, out: &mut Vec<&'a T>) {
    match criteria {
        Criteria::Leaf(value) => out.push(value),
        Criteria::All(children) | Criteria::Any(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

impl From<Condition> for Criteria<Condition> {
    fn from(condition: Condition) -> Self {
        Criteria::Leaf(condition)
    }
}

impl<T: fmt::Display> fmt::Display for Criteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, false)
    }
}

// Renders the criteria DSL. `and` binds tighter than `or`, so a disjunction
// only needs parentheses when it sits inside a conjunction.
fn write_node<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    node: &Criteria<T>,
    in_and: bool,
) -> fmt::Result {
    match node {
        Criteria::Leaf(value) => write!(f, "{value}"),
        Criteria::All(children) if children.is_empty() => f.write_str("all()"),
        Criteria::Any(children) if children.is_empty() => f.write_str("any()"),
        Criteria::All(children) => write_joined(f, children, " and ", true),
        Criteria::Any(children) if children.len() == 1 => write_node(f, &children[0], in_and),
        Criteria::Any(children) if in_and => {
            f.write_str("(")?;
            write_joined(f, children, " or ", false)?;
            f.write_str(")")
        }
        Criteria::Any(children) => write_joined(f, children, " or ", false),
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    children: &[Criteria<T>],
    sep: &str,
    in_and: bool,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write_node(f, child, in_and)?;
    }
    Ok(())
}

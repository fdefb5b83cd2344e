mod error;
mod grammar;

use std::str::FromStr;

pub use error::ParseError;

use crate::{Condition, Criteria};

/// Parse criteria DSL text into a condition tree.
///
/// Rule names are not checked here; pass the result through
/// [`RuleRegistry::validate`](crate::RuleRegistry::validate) for that.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax.
pub fn parse(input: &str) -> Result<Criteria<Condition>, ParseError> {
    use winnow::Parser;
    grammar::criteria
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}

impl Criteria<Condition> {
    /// Parse criteria from DSL text such as
    /// `IS_ENTITY_KIND(["template"]) or (IS_OWNER("team-a") and IS_ORPHAN())`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the input is not valid DSL syntax.
    pub fn from_dsl(input: &str) -> Result<Self, ParseError> {
        parse(input)
    }
}

impl FromStr for Criteria<Condition> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

use thiserror::Error;

use crate::RuleError;
use crate::parse::ParseError;

/// Unified error type covering parsing, rule interpretation, JSON and settings.
///
/// Returned by convenience entry points such as
/// [`RuleRegistry::apply_dsl()`](crate::RuleRegistry::apply_dsl),
/// [`RuleRegistry::to_query_dsl()`](crate::RuleRegistry::to_query_dsl) and
/// [`Criteria::from_json()`](crate::Criteria::from_json).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "server")]
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

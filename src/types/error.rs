use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("rule name '{name}' is reserved for empty groups")]
    ReservedName { name: String },

    #[error("unknown rule '{name}'")]
    UnknownRule { name: String },

    #[error("invalid params for rule '{rule}': {message}")]
    InvalidParams { rule: String, message: String },
}

impl RuleError {
    /// Name of the rule this error refers to.
    #[must_use]
    pub fn rule_name(&self) -> &str {
        match self {
            RuleError::DuplicateRule { name }
            | RuleError::ReservedName { name }
            | RuleError::UnknownRule { name } => name,
            RuleError::InvalidParams { rule, .. } => rule,
        }
    }
}

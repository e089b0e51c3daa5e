//! Policy engine error types.

/// Errors that can occur while constructing or mutating a [`crate::engine::PolicyEngine`].
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid regex pattern in rule '{rule_id}': {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule '{0}' not found")]
    RuleNotFound(String),
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),
    #[error("DLP rule '{0}' has an empty redaction placeholder")]
    EmptyPlaceholder(String),
}

//! Rule definitions for the three policy stages.

use crate::error::PolicyError;
use crate::types::{DataType, Severity};
use serde::{Deserialize, Serialize};

/// Stage 1: a regex scanned against the raw query/prompt text. Any match
/// blocks the request outright — there is no partial credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedQueryRule {
    pub id: String,
    pub name: String,
    pub pattern: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip, default)]
    compiled: Option<regex::bytes::Regex>,
}

impl BlockedQueryRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let id = id.into();
        let pattern = pattern.into();
        let compiled = regex::bytes::Regex::new(&format!("(?i){pattern}"))
            .map_err(|source| PolicyError::InvalidPattern { rule_id: id.clone(), source })?;
        Ok(Self {
            id,
            name: name.into(),
            pattern,
            severity,
            message: message.into(),
            compiled: Some(compiled),
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.compiled {
            Some(re) => re.is_match(text.as_bytes()),
            None => false,
        }
    }
}

/// A condition inside an [`AccessPolicy`]. Conditions are ANDed together
/// within a single policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    In,
}

impl Condition {
    /// Resolve `field` against the subject attributes and compare.
    fn eval(&self, subject: &std::collections::HashMap<String, String>) -> bool {
        let actual = subject.get(&self.field).map(String::as_str).unwrap_or("");
        match self.operator {
            Operator::Equals => actual == self.value,
            Operator::NotEquals => actual != self.value,
            Operator::Contains => actual.contains(&self.value),
            Operator::In => self.value.split(',').any(|v| v.trim() == actual),
        }
    }
}

/// Stage 2: attribute-based access control. When all `conditions` match the
/// subject attributes derived from the requesting [`crate::types::User`],
/// the policy denies (or, if `allow` is true, explicitly permits,
/// short-circuiting later deny policies of equal specificity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Condition>,
    pub allow: bool,
    pub severity: Severity,
    pub message: String,
}

impl AccessPolicy {
    pub fn matches(&self, subject: &std::collections::HashMap<String, String>) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.eval(subject))
    }
}

/// Stage 3: a DLP rule pairs a [`DataType`] with the validator used to find
/// it in text. `redact` controls whether matches of this type get masked in
/// `redact_sensitive` output versus merely reported. `placeholder` is the
/// token substituted for a masked span; it must never be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlpRule {
    pub id: String,
    pub data_type: DataType,
    pub severity: Severity,
    pub min_confidence: f32,
    pub redact: bool,
    pub placeholder: String,
}

impl DlpRule {
    pub fn new(id: impl Into<String>, data_type: DataType, severity: Severity) -> Self {
        Self {
            id: id.into(),
            data_type,
            severity,
            min_confidence: 0.5,
            redact: true,
            placeholder: default_placeholder(data_type),
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_redact(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

fn default_placeholder(data_type: DataType) -> String {
    format!("[REDACTED_{}]", data_type.as_str().to_uppercase())
}

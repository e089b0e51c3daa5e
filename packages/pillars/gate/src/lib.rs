//! AgentKern-Gate: Policy Engine
//!
//! Evaluates agent-issued queries, prompts and responses against a fixed
//! three-stage pipeline — blocked-query patterns, attribute-based access
//! policies, then DLP/PII scanning — and exposes redaction for whatever
//! the DLP stage turns up. See [`engine::PolicyEngine`] for the entry point.

pub mod defaults;
pub mod engine;
pub mod error;
pub mod rules;
pub mod types;
pub mod validators;

pub use engine::PolicyEngine;
pub use error::PolicyError;
pub use rules::{AccessPolicy, BlockedQueryRule, Condition, DlpRule, Operator};
pub use types::{DataType, Decision, PiiResult, Severity, TextKind, User, Violation};

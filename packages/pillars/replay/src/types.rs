//! Execution snapshot / summary data model

use serde::{Deserialize, Serialize};

/// Step-level lifecycle status. `Paused` marks a step awaiting human
/// approval — distinct from `Pending`/`Running`/`Completed`/`Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

/// Request-level lifecycle status. No `Paused` variant — a request is only
/// ever pending, running, completed, or failed; a paused step doesn't pause
/// the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One step of a request: an immutable record of input, output, resource
/// usage, and policy activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub request_id: String,
    pub step_index: u32,
    pub step_name: String,
    pub status: StepStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<i64>,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub policies_checked: Vec<String>,
    pub policy_events: Vec<String>,
    pub error_message: Option<String>,
    pub retry_count: u32,
}

impl ExecutionSnapshot {
    pub fn new(request_id: impl Into<String>, step_index: u32, step_name: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            step_index,
            step_name: step_name.into(),
            status: StepStatus::Pending,
            started_at: chrono::Utc::now(),
            completed_at: None,
            duration_ms: None,
            input: None,
            output: None,
            provider: None,
            model: None,
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            policies_checked: Vec::new(),
            policy_events: Vec::new(),
            error_message: None,
            retry_count: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, StepStatus::Completed | StepStatus::Failed)
    }
}

/// Aggregate record spanning every step of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub request_id: String,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<i64>,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub org_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub input_summary: Option<String>,
    pub output_summary: Option<String>,
    pub error_message: Option<String>,
}

impl ExecutionSummary {
    pub fn new(
        request_id: impl Into<String>,
        workflow_name: impl Into<String>,
        total_steps: u32,
        org_id: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            workflow_name: workflow_name.into(),
            status: ExecutionStatus::Running,
            total_steps,
            completed_steps: 0,
            started_at: chrono::Utc::now(),
            completed_at: None,
            duration_ms: None,
            total_tokens: 0,
            total_cost_usd: 0.0,
            org_id: org_id.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            input_summary: None,
            output_summary: None,
            error_message: None,
        }
    }
}

/// One row of a [`Timeline`] projection — `GetTimeline`'s per-step view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub step_index: u32,
    pub step_name: String,
    pub status: StepStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<i64>,
    pub has_error: bool,
    pub has_approval: bool,
}

impl From<&ExecutionSnapshot> for TimelineEntry {
    fn from(snapshot: &ExecutionSnapshot) -> Self {
        Self {
            step_index: snapshot.step_index,
            step_name: snapshot.step_name.clone(),
            status: snapshot.status,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            duration_ms: snapshot.duration_ms,
            has_error: snapshot.error_message.as_deref().is_some_and(|m| !m.is_empty()),
            has_approval: matches!(snapshot.status, StepStatus::Paused),
        }
    }
}

/// Filters for `ListExecutions`; all fields are optional ANDed predicates.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub status: Option<ExecutionStatus>,
    pub org_id: Option<String>,
    pub tenant_id: Option<String>,
    pub workflow_name: Option<String>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Pagination parameters; defaults to `limit=50`, `offset=0`.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

/// A compliance framework label attachable to an export — pure metadata,
/// never a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceFramework {
    Soc2TypeI,
    Soc2TypeII,
    Iso27001,
    FedRampLow,
    FedRampModerate,
    FedRampHigh,
    Hipaa,
    PciDss,
}

/// Which fields an export includes. Disabling a field strips it from both
/// the summary and every step record before serialization.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: String,
    pub include_input: bool,
    pub include_output: bool,
    pub include_policies: bool,
    pub compliance_tags: Vec<ComplianceFramework>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            include_input: true,
            include_output: true,
            include_policies: true,
            compliance_tags: Vec::new(),
        }
    }
}

/// The self-describing export blob produced by `ExportExecution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionExport {
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compliance_tags: Vec<ComplianceFramework>,
    pub summary: serde_json::Value,
    pub steps: Vec<serde_json::Value>,
}

pub(crate) fn strip_field(value: &mut serde_json::Value, field: &str) {
    if let serde_json::Value::Object(map) = value {
        map.remove(field);
    }
}

pub(crate) fn strip_fields(value: &mut serde_json::Value, fields: &[&str]) {
    for field in fields {
        strip_field(value, field);
    }
}

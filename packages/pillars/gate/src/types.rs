//! Core request/decision types for the Policy Engine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The caller identity a policy decision is made against.
///
/// Role/permission attributes live alongside tenancy, not as a separate
/// unrelated concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: String,
    pub permissions: HashSet<String>,
    pub department: Option<String>,
    pub region: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            permissions: HashSet::new(),
            department: None,
            region: None,
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Whether this user is allowed to see a given PII type in the clear.
    ///
    /// admin, read_pii, or type-specific read_<type>.
    pub fn can_view_pii(&self, data_type: DataType) -> bool {
        self.permissions.contains("admin")
            || self.permissions.contains("read_pii")
            || self
                .permissions
                .contains(&format!("read_{}", data_type.as_str()))
    }
}

/// What kind of text is being evaluated — currently only affects logging
/// context, not evaluation order — evaluation order is always fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    Query,
    Prompt,
    Response,
}

/// DLP data-type tags. `Custom` covers rule authors' own tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Ssn,
    CreditCard,
    Email,
    Phone,
    Ip,
    Iban,
    Passport,
    Dob,
    DriverLicense,
    BankAccount,
    AbaRouting,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssn => "ssn",
            Self::CreditCard => "credit_card",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Ip => "ip",
            Self::Iban => "iban",
            Self::Passport => "passport",
            Self::Dob => "dob",
            Self::DriverLicense => "driver_license",
            Self::BankAccount => "bank_account",
            Self::AbaRouting => "aba_routing",
        }
    }
}

/// Severity of a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single triggered access-policy or blocked-query violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
}

/// A PII detection before redaction is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiResult {
    pub data_type: DataType,
    pub matched_value: String,
    pub severity: Severity,
    pub confidence: f32,
    pub start: usize,
    pub end: usize,
    pub context: String,
}

/// The result of `PolicyEngine::evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub blocked_by: Vec<String>,
    pub violations: Vec<Violation>,
    pub pii_found: Vec<PiiResult>,
}

impl Decision {
    pub(crate) fn allow() -> Self {
        Self {
            allowed: true,
            blocked_by: Vec::new(),
            violations: Vec::new(),
            pii_found: Vec::new(),
        }
    }
}

//! The policy evaluation engine: fixed-order blocked-query, access-policy
//! and DLP scanning, plus sensitive-data redaction.

use crate::error::PolicyError;
use crate::rules::{AccessPolicy, BlockedQueryRule, DlpRule};
use crate::types::{DataType, Decision, PiiResult, Severity, TextKind, User, Violation};
use crate::validators;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

type Validator = fn(&str) -> Vec<validators::Match>;

fn validator_for(data_type: DataType) -> Validator {
    match data_type {
        DataType::Ssn => validators::find_ssn,
        DataType::CreditCard => validators::find_credit_card,
        DataType::Email => validators::find_email,
        DataType::Phone => validators::find_phone,
        DataType::Ip => validators::find_ipv4,
        DataType::Iban => validators::find_iban,
        DataType::Passport => validators::find_passport,
        DataType::Dob => validators::find_dob,
        DataType::DriverLicense => validators::find_driver_license,
        DataType::BankAccount => validators::find_bank_account,
        DataType::AbaRouting => validators::find_aba_routing,
    }
}

struct RuleStore {
    blocked_query: Vec<BlockedQueryRule>,
    access_policies: Vec<AccessPolicy>,
    dlp: Vec<DlpRule>,
}

/// Evaluates text against a tenant's configured rule set in the fixed order:
/// blocked-query regex scan, then access-policy condition scan, then DLP/PII
/// scan. A hit at any earlier stage short-circuits the later ones.
///
/// Rule mutation goes through a single `RwLock` guarding a plain `HashMap`,
/// matching the read-heavy/write-rare access pattern of policy config.
pub struct PolicyEngine {
    rules: Arc<RwLock<RuleStore>>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(RuleStore {
                blocked_query: Vec::new(),
                access_policies: Vec::new(),
                dlp: Vec::new(),
            })),
        }
    }

    pub fn add_blocked_query_rule(&self, rule: BlockedQueryRule) -> Result<(), PolicyError> {
        let mut store = self.rules.write().expect("policy rule lock poisoned");
        if store.blocked_query.iter().any(|r| r.id == rule.id) {
            return Err(PolicyError::DuplicateRule(rule.id));
        }
        store.blocked_query.push(rule);
        Ok(())
    }

    pub fn add_access_policy(&self, policy: AccessPolicy) -> Result<(), PolicyError> {
        let mut store = self.rules.write().expect("policy rule lock poisoned");
        if store.access_policies.iter().any(|p| p.id == policy.id) {
            return Err(PolicyError::DuplicateRule(policy.id));
        }
        store.access_policies.push(policy);
        Ok(())
    }

    pub fn add_dlp_rule(&self, rule: DlpRule) -> Result<(), PolicyError> {
        if rule.placeholder.is_empty() {
            return Err(PolicyError::EmptyPlaceholder(rule.id));
        }
        let mut store = self.rules.write().expect("policy rule lock poisoned");
        if store.dlp.iter().any(|r| r.id == rule.id) {
            return Err(PolicyError::DuplicateRule(rule.id));
        }
        store.dlp.push(rule);
        Ok(())
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<(), PolicyError> {
        let mut store = self.rules.write().expect("policy rule lock poisoned");
        let before = store.blocked_query.len() + store.access_policies.len() + store.dlp.len();
        store.blocked_query.retain(|r| r.id != rule_id);
        store.access_policies.retain(|p| p.id != rule_id);
        store.dlp.retain(|r| r.id != rule_id);
        let after = store.blocked_query.len() + store.access_policies.len() + store.dlp.len();
        if before == after {
            return Err(PolicyError::RuleNotFound(rule_id.to_string()));
        }
        Ok(())
    }

    /// Evaluate `text` for `user`. Evaluation order is fixed and not
    /// configurable: blocked-query scan, then access-policy scan, then DLP
    /// scan. The first two stages can block; DLP never blocks on its own —
    /// it only reports findings for `redact_sensitive` to act on.
    pub fn evaluate(&self, user: &User, text: &str, kind: TextKind) -> Decision {
        let store = self.rules.read().expect("policy rule lock poisoned");

        // Stage 1: blocked-query regex scan.
        for rule in &store.blocked_query {
            if rule.is_match(text) {
                tracing::info!(
                    target: "agentkern_gate::audit",
                    user_id = %user.id,
                    kind = ?kind,
                    rule_id = %rule.id,
                    stage = "blocked_query",
                    "request blocked"
                );
                return Decision {
                    allowed: false,
                    blocked_by: vec![rule.id.clone()],
                    violations: vec![Violation {
                        id: Uuid::new_v4().to_string(),
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        severity: rule.severity,
                        message: rule.message.clone(),
                    }],
                    pii_found: Vec::new(),
                };
            }
        }

        // Stage 2: access-policy condition scan.
        let subject = subject_attributes(user);
        for policy in &store.access_policies {
            if policy.matches(&subject) && !policy.allow {
                tracing::info!(
                    target: "agentkern_gate::audit",
                    user_id = %user.id,
                    kind = ?kind,
                    policy_id = %policy.id,
                    stage = "access_policy",
                    "request denied"
                );
                return Decision {
                    allowed: false,
                    blocked_by: vec![policy.id.clone()],
                    violations: vec![Violation {
                        id: Uuid::new_v4().to_string(),
                        rule_id: policy.id.clone(),
                        rule_name: policy.name.clone(),
                        severity: policy.severity,
                        message: policy.message.clone(),
                    }],
                    pii_found: Vec::new(),
                };
            }
        }

        // Stage 3: DLP/PII scan. Never blocks by itself.
        let mut decision = Decision::allow();
        for rule in &store.dlp {
            let finder = validator_for(rule.data_type);
            for m in finder(text) {
                if m.confidence < rule.min_confidence {
                    continue;
                }
                if !user.can_view_pii(rule.data_type) {
                    decision.pii_found.push(PiiResult {
                        data_type: m.data_type,
                        matched_value: m.value,
                        severity: rule.severity,
                        confidence: m.confidence,
                        start: m.start,
                        end: m.end,
                        context: text
                            .get(m.start.saturating_sub(50)..m.end.saturating_add(50).min(text.len()))
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
            }
        }

        if !decision.pii_found.is_empty() {
            tracing::info!(
                target: "agentkern_gate::audit",
                user_id = %user.id,
                kind = ?kind,
                pii_count = decision.pii_found.len(),
                stage = "dlp",
                "sensitive data detected"
            );
        }

        decision
    }

    /// Mask every span a DLP-flagged finding covers in `text`, using each
    /// finding's rule's `placeholder` as the replacement token, and return
    /// the redacted text alongside the distinct data types that were masked
    /// (in order of first appearance). Findings are masked back-to-front so
    /// earlier byte offsets stay valid.
    pub fn redact_sensitive(&self, user: &User, text: &str, kind: TextKind) -> (String, Vec<DataType>) {
        let decision = self.evaluate(user, text, kind);
        let store = self.rules.read().expect("policy rule lock poisoned");
        let placeholders: HashMap<DataType, &str> = store
            .dlp
            .iter()
            .filter(|r| r.redact)
            .map(|r| (r.data_type, r.placeholder.as_str()))
            .collect();

        let mut spans: Vec<&PiiResult> = decision
            .pii_found
            .iter()
            .filter(|p| placeholders.contains_key(&p.data_type))
            .collect();
        spans.sort_by(|a, b| a.start.cmp(&b.start));

        let mut detected_types = Vec::new();
        for pii in &spans {
            if !detected_types.contains(&pii.data_type) {
                detected_types.push(pii.data_type);
            }
        }

        spans.sort_by(|a, b| b.start.cmp(&a.start));
        let mut redacted = text.to_string();
        for pii in spans {
            let token = placeholders[&pii.data_type];
            redacted.replace_range(pii.start..pii.end, token);
        }
        (redacted, detected_types)
    }
}

fn subject_attributes(user: &User) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    attrs.insert("role".to_string(), user.role.clone());
    if let Some(department) = &user.department {
        attrs.insert("department".to_string(), department.clone());
    }
    if let Some(region) = &user.region {
        attrs.insert("region".to_string(), region.clone());
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, Operator};

    fn engine_with_drop_table_rule() -> PolicyEngine {
        let engine = PolicyEngine::new();
        engine
            .add_blocked_query_rule(
                BlockedQueryRule::new(
                    "blk-drop-table",
                    "destructive DROP TABLE",
                    r"drop\s+table",
                    Severity::Critical,
                    "DROP TABLE statements are never permitted",
                )
                .unwrap(),
            )
            .unwrap();
        engine
    }

    #[test]
    fn blocked_query_stage_short_circuits() {
        let engine = engine_with_drop_table_rule();
        let user = User::new("u1", "analyst");
        let decision = engine.evaluate(&user, "DROP TABLE customers;", TextKind::Query);
        assert!(!decision.allowed);
        assert_eq!(decision.blocked_by, vec!["blk-drop-table"]);
        assert!(decision.pii_found.is_empty());
    }

    #[test]
    fn access_policy_denies_by_department() {
        let engine = PolicyEngine::new();
        engine
            .add_access_policy(AccessPolicy {
                id: "deny-finance".to_string(),
                name: "finance data is internal only".to_string(),
                conditions: vec![Condition {
                    field: "department".to_string(),
                    operator: Operator::NotEquals,
                    value: "finance".to_string(),
                }],
                allow: false,
                severity: Severity::High,
                message: "only finance department may query this table".to_string(),
            })
            .unwrap();

        let outsider = User::new("u2", "analyst").with_department("sales");
        let decision = engine.evaluate(&outsider, "select * from ledgers", TextKind::Query);
        assert!(!decision.allowed);

        let insider = User::new("u3", "analyst").with_department("finance");
        let decision = engine.evaluate(&insider, "select * from ledgers", TextKind::Query);
        assert!(decision.allowed);
    }

    #[test]
    fn dlp_stage_reports_but_does_not_block() {
        let engine = PolicyEngine::new();
        engine
            .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::High))
            .unwrap();
        let user = User::new("u4", "analyst");
        let decision = engine.evaluate(&user, "customer ssn is 123-45-6789", TextKind::Response);
        assert!(decision.allowed);
        assert_eq!(decision.pii_found.len(), 1);
    }

    #[test]
    fn dlp_stage_skips_users_with_read_permission() {
        let engine = PolicyEngine::new();
        engine
            .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::High))
            .unwrap();
        let privileged = User::new("u5", "auditor").with_permissions(["read_pii"]);
        let decision = engine.evaluate(&privileged, "ssn 123-45-6789", TextKind::Response);
        assert!(decision.pii_found.is_empty());
    }

    #[test]
    fn redact_sensitive_masks_flagged_spans() {
        let engine = PolicyEngine::new();
        engine
            .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::High))
            .unwrap();
        let user = User::new("u6", "analyst");
        let (redacted, detected) =
            engine.redact_sensitive(&user, "ssn 123-45-6789 on file", TextKind::Response);
        assert_eq!(redacted, "ssn [REDACTED_SSN] on file");
        assert_eq!(detected, vec![DataType::Ssn]);
    }

    #[test]
    fn add_dlp_rule_rejects_empty_placeholder() {
        let engine = PolicyEngine::new();
        let rule = DlpRule::new("dlp-ssn", DataType::Ssn, Severity::High).with_placeholder("");
        assert!(matches!(
            engine.add_dlp_rule(rule),
            Err(PolicyError::EmptyPlaceholder(_))
        ));
    }

    #[test]
    fn duplicate_rule_id_is_rejected() {
        let engine = engine_with_drop_table_rule();
        let result = engine.add_blocked_query_rule(
            BlockedQueryRule::new(
                "blk-drop-table",
                "dup",
                r"drop\s+table",
                Severity::Critical,
                "dup",
            )
            .unwrap(),
        );
        assert!(matches!(result, Err(PolicyError::DuplicateRule(_))));
    }
}

//! Golden tests for Policy Engine evaluation.
//!
//! These lock in the fixed three-stage evaluation order and the redaction
//! contract so that future rule-set changes can't silently reorder or
//! skip a stage.

use agentkern_gate::{
    AccessPolicy, BlockedQueryRule, Condition, DataType, DlpRule, Operator, PolicyEngine,
    Severity, TextKind, User,
};

#[test]
fn golden_blocked_query_beats_everything_else() {
    let engine = PolicyEngine::new();
    engine
        .add_blocked_query_rule(
            BlockedQueryRule::new(
                "blk-drop-table",
                "DROP TABLE",
                r"drop\s+table",
                Severity::Critical,
                "destructive statement blocked",
            )
            .unwrap(),
        )
        .unwrap();
    engine
        .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::High))
        .unwrap();

    let user = User::new("agent-7", "service");
    let decision = engine.evaluate(
        &user,
        "DROP TABLE customers; -- ssn 123-45-6789",
        TextKind::Query,
    );

    assert!(!decision.allowed);
    assert_eq!(decision.blocked_by, vec!["blk-drop-table"]);
    // DLP never even runs once stage 1 blocks.
    assert!(decision.pii_found.is_empty());
}

#[test]
fn golden_access_policy_denies_cross_department_read() {
    let engine = PolicyEngine::new();
    engine
        .add_access_policy(AccessPolicy {
            id: "deny-hr-to-non-hr".to_string(),
            name: "HR records require HR department".to_string(),
            conditions: vec![Condition {
                field: "department".to_string(),
                operator: Operator::NotEquals,
                value: "hr".to_string(),
            }],
            allow: false,
            severity: Severity::High,
            message: "only HR may query employee records".to_string(),
        })
        .unwrap();

    let engineer = User::new("agent-3", "service").with_department("engineering");
    let decision = engine.evaluate(&engineer, "select * from employee_records", TextKind::Query);
    assert!(!decision.allowed);
    assert_eq!(decision.blocked_by, vec!["deny-hr-to-non-hr"]);

    let hr_agent = User::new("agent-4", "service").with_department("hr");
    let decision = engine.evaluate(&hr_agent, "select * from employee_records", TextKind::Query);
    assert!(decision.allowed);
}

#[test]
fn golden_dlp_flags_without_blocking_and_redaction_masks_spans() {
    let engine = PolicyEngine::new();
    engine
        .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::Critical))
        .unwrap();
    engine
        .add_dlp_rule(DlpRule::new("dlp-email", DataType::Email, Severity::Low))
        .unwrap();

    let user = User::new("agent-9", "service");
    let text = "reach jane@example.com about ssn 123-45-6789 on the account";
    let decision = engine.evaluate(&user, text, TextKind::Response);

    assert!(decision.allowed);
    assert_eq!(decision.pii_found.len(), 2);

    let (redacted, detected) = engine.redact_sensitive(&user, text, TextKind::Response);
    assert!(redacted.contains("[REDACTED_SSN]"));
    assert!(redacted.contains("[REDACTED_EMAIL]"));
    assert!(!redacted.contains("123-45-6789"));
    assert!(!redacted.contains("jane@example.com"));
    assert_eq!(detected.len(), 2);
    assert!(detected.contains(&DataType::Email));
    assert!(detected.contains(&DataType::Ssn));
}

#[test]
fn golden_privileged_user_sees_pii_in_the_clear() {
    let engine = PolicyEngine::new();
    engine
        .add_dlp_rule(DlpRule::new("dlp-ssn", DataType::Ssn, Severity::Critical))
        .unwrap();

    let auditor = User::new("agent-11", "auditor").with_permissions(["read_ssn"]);
    let decision = engine.evaluate(&auditor, "ssn 123-45-6789 confirmed", TextKind::Response);
    assert!(decision.pii_found.is_empty());

    let (redacted, detected) =
        engine.redact_sensitive(&auditor, "ssn 123-45-6789 confirmed", TextKind::Response);
    assert_eq!(redacted, "ssn 123-45-6789 confirmed");
    assert!(detected.is_empty());
}

#[test]
fn golden_low_confidence_matches_are_not_reported() {
    let engine = PolicyEngine::new();
    // Bank account numbers need "account"/"acct" context to clear the
    // default 0.5 min-confidence threshold.
    engine
        .add_dlp_rule(DlpRule::new("dlp-bank", DataType::BankAccount, Severity::High))
        .unwrap();

    let user = User::new("agent-12", "service");
    let decision = engine.evaluate(&user, "order number 48213907 shipped", TextKind::Response);
    assert!(decision.pii_found.is_empty());
}

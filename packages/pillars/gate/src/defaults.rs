//! Built-in rule sets a tenant can seed a fresh [`crate::engine::PolicyEngine`]
//! with, rather than starting from an empty rule store.

use crate::engine::PolicyEngine;
use crate::error::PolicyError;
use crate::rules::{BlockedQueryRule, DlpRule};
use crate::types::{DataType, Severity};

/// Destructive-statement blocklist: `DROP TABLE`, `TRUNCATE`, `DELETE FROM`
/// without a `WHERE` clause, and `DROP DATABASE`.
pub fn seed_blocked_query_rules(engine: &PolicyEngine) -> Result<(), PolicyError> {
    engine.add_blocked_query_rule(BlockedQueryRule::new(
        "blk-drop-table",
        "DROP TABLE",
        r"drop\s+table",
        Severity::Critical,
        "DROP TABLE statements are blocked by default policy",
    )?)?;
    engine.add_blocked_query_rule(BlockedQueryRule::new(
        "blk-drop-database",
        "DROP DATABASE",
        r"drop\s+database",
        Severity::Critical,
        "DROP DATABASE statements are blocked by default policy",
    )?)?;
    engine.add_blocked_query_rule(BlockedQueryRule::new(
        "blk-truncate",
        "TRUNCATE TABLE",
        r"truncate\s+table",
        Severity::High,
        "TRUNCATE TABLE statements are blocked by default policy",
    )?)?;
    engine.add_blocked_query_rule(BlockedQueryRule::new(
        "blk-delete-no-where",
        "unqualified DELETE",
        r"delete\s+from\s+\w+\s*;",
        Severity::High,
        "DELETE without a WHERE clause is blocked by default policy",
    )?)?;
    Ok(())
}

/// One DLP rule per supported data type, all at a moderate default
/// confidence threshold, all redacted by default.
pub fn seed_dlp_rules(engine: &PolicyEngine) -> Result<(), PolicyError> {
    let defaults = [
        (DataType::Ssn, Severity::Critical),
        (DataType::CreditCard, Severity::Critical),
        (DataType::Email, Severity::Low),
        (DataType::Phone, Severity::Low),
        (DataType::Ip, Severity::Low),
        (DataType::Iban, Severity::High),
        (DataType::Passport, Severity::High),
        (DataType::Dob, Severity::Medium),
        (DataType::DriverLicense, Severity::Medium),
        (DataType::BankAccount, Severity::High),
        (DataType::AbaRouting, Severity::High),
    ];
    for (data_type, severity) in defaults {
        let rule_id = format!("dlp-{}", data_type.as_str());
        engine.add_dlp_rule(DlpRule::new(rule_id, data_type, severity))?;
    }
    Ok(())
}

/// Build a [`PolicyEngine`] pre-seeded with both default rule sets — the
/// starting point most tenants onboard with before layering custom rules.
pub fn seeded_engine() -> Result<PolicyEngine, PolicyError> {
    let engine = PolicyEngine::new();
    seed_blocked_query_rules(&engine)?;
    seed_dlp_rules(&engine)?;
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextKind, User};

    #[test]
    fn seeded_engine_blocks_drop_table() {
        let engine = seeded_engine().unwrap();
        let user = User::new("u1", "analyst");
        let decision = engine.evaluate(&user, "DROP TABLE accounts;", TextKind::Query);
        assert!(!decision.allowed);
    }

    #[test]
    fn seeded_engine_flags_ssn() {
        let engine = seeded_engine().unwrap();
        let user = User::new("u1", "analyst");
        let decision = engine.evaluate(&user, "ssn on file: 123-45-6789", TextKind::Response);
        assert!(decision.allowed);
        assert!(!decision.pii_found.is_empty());
    }
}

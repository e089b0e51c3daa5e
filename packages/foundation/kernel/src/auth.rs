//! License-key validation seam.
//!
//! tenant/org identity is either carried in explicit
//! `X-Tenant-ID`/`X-Org-ID` headers, or derived from a validated license key
//! passed as a bearer token. This module supplies the trait and a
//! test/local-dev implementation; no concrete vendor license-server binding
//! is wired in here.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("license key was not recognized")]
    InvalidKey,
    #[error("no credentials supplied")]
    MissingCredentials,
}

/// Resolves a license key (bearer token) into a `(tenant_id, org_id)` pair.
pub trait LicenseValidator: Send + Sync {
    fn validate(&self, license_key: &str) -> Result<(String, String), AuthError>;
}

/// A `HashMap`-backed validator for tests and local development.
///
/// Production deployments supply their own `LicenseValidator` that calls out
/// to the real license service; that binding is outside this crate's scope.
#[derive(Debug, Default, Clone)]
pub struct StaticLicenseValidator {
    keys: HashMap<String, (String, String)>,
}

impl StaticLicenseValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, license_key: impl Into<String>, tenant_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        self.keys.insert(license_key.into(), (tenant_id.into(), org_id.into()));
        self
    }
}

impl LicenseValidator for StaticLicenseValidator {
    fn validate(&self, license_key: &str) -> Result<(String, String), AuthError> {
        self.keys
            .get(license_key)
            .cloned()
            .ok_or(AuthError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_key() {
        let validator = StaticLicenseValidator::new().with_key("lk_test", "tenant-1", "org-1");
        assert_eq!(
            validator.validate("lk_test").unwrap(),
            ("tenant-1".to_string(), "org-1".to_string())
        );
    }

    #[test]
    fn rejects_unknown_key() {
        let validator = StaticLicenseValidator::new();
        assert!(matches!(validator.validate("nope"), Err(AuthError::InvalidKey)));
    }
}

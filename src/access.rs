//! Access gate: a single shared password in front of every interaction.
//!
//! There is no lockout, rate limiting or hashing. The submitted secret is
//! compared against the configured one and any mismatch stops the current
//! interaction before any service is called.

use crate::error::HwOcrError;
use tracing::warn;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Compare a submitted secret with the expected one.
///
/// An empty expected secret never grants access, so "both empty" is a denial.
pub fn authorize(submitted: &str, expected: &str) -> Access {
    if !expected.is_empty() && submitted == expected {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Holds the expected password for the lifetime of the process.
#[derive(Clone)]
pub struct AccessGate {
    expected: String,
}

impl AccessGate {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    /// `Ok(())` when `submitted` matches, [`HwOcrError::AccessDenied`] otherwise.
    pub fn check(&self, submitted: &str) -> Result<(), HwOcrError> {
        match authorize(submitted, &self.expected) {
            Access::Allow => Ok(()),
            Access::Deny => {
                warn!("Access denied ({} chars submitted)", submitted.chars().count());
                Err(HwOcrError::AccessDenied)
            }
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_allows() {
        assert_eq!(authorize("rahasia", "rahasia"), Access::Allow);
    }

    #[test]
    fn any_mismatch_denies() {
        for submitted in ["", "Rahasia", "rahasia ", "x", "rahasia2"] {
            assert_eq!(authorize(submitted, "rahasia"), Access::Deny, "{submitted:?}");
        }
    }

    #[test]
    fn both_empty_denies() {
        assert_eq!(authorize("", ""), Access::Deny);
    }

    #[test]
    fn gate_maps_denial_to_error() {
        let gate = AccessGate::new("rahasia");
        assert!(gate.check("rahasia").is_ok());
        assert!(matches!(gate.check("salah"), Err(HwOcrError::AccessDenied)));
    }

    #[test]
    fn debug_hides_secret() {
        let gate = AccessGate::new("rahasia");
        assert!(!format!("{gate:?}").contains("rahasia"));
    }
}

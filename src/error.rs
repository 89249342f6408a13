//! Error types for portfolio analytics
//!
//! Expected conditions (empty snapshots, unknown stage or segment strings)
//! never produce errors; they resolve to documented defaults. Errors are
//! reserved for:
//! - Contract violations: malformed snapshots, records missing a field the
//!   active computation needs
//! - Environment failures: unreadable or invalid configuration files

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ProductId;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid {what} snapshot: {reason}")]
    InvalidSnapshot { what: &'static str, reason: String },

    #[error("History record for product {product_id} is missing {field}")]
    MissingField {
        product_id: ProductId,
        field: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl AnalyticsError {
    /// Returns true if the error came from bad input data rather than the
    /// environment.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AnalyticsError::InvalidSnapshot { .. } | AnalyticsError::MissingField { .. }
        )
    }
}

/// Serializable record of one analytics component that could not run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationFailure {
    pub component: String,
    pub message: String,
    pub contract_violation: bool,
}

impl ComputationFailure {
    pub fn new(component: &str, err: &AnalyticsError) -> Self {
        log::warn!("{} skipped: {}", component, err);
        ComputationFailure {
            component: component.to_string(),
            message: err.to_string(),
            contract_violation: err.is_contract_violation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let missing = AnalyticsError::MissingField {
            product_id: 3,
            field: "change_date",
        };
        assert!(missing.is_contract_violation());
        assert!(!AnalyticsError::Config("bad".into()).is_contract_violation());
    }

    #[test]
    fn test_failure_carries_message() {
        let err = AnalyticsError::InvalidSnapshot {
            what: "products",
            reason: "expected an array".into(),
        };
        let failure = ComputationFailure::new("ingest", &err);
        assert_eq!(failure.component, "ingest");
        assert_eq!(failure.message, "Invalid products snapshot: expected an array");
        assert!(failure.contract_violation);
    }
}

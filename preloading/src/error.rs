//! Error types for preloading.
//!
//! Contract violations are programmer errors: out-of-order state
//! transitions or values that make no sense for the current state. They are
//! logged, panic in debug builds, and are otherwise ignored, leaving the
//! state untouched. Configuration and logging errors are ordinary
//! recoverable errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::attempt::{
    PreloadingEligibility, PreloadingFailureReason, PreloadingHoldbackStatus,
    PreloadingTriggeringOutcome,
};
use crate::prefetch::CookieCopyState;

/// A violated ordering or value contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Eligibility can only be set once.
    #[error("eligibility already set to {current:?}")]
    EligibilityAlreadySet { current: PreloadingEligibility },

    /// Holdback status requires an eligible attempt.
    #[error("holdback status set while eligibility is {eligibility:?}")]
    HoldbackBeforeEligible { eligibility: PreloadingEligibility },

    /// Holdback status can only be set once.
    #[error("holdback status already set to {current:?}")]
    HoldbackAlreadySet { current: PreloadingHoldbackStatus },

    /// Triggering outcome only advances for allowed attempts.
    #[error("triggering outcome set while holdback status is {holdback:?}")]
    OutcomeWithoutAllowed { holdback: PreloadingHoldbackStatus },

    /// Transition not present in the outcome transition table.
    #[error("illegal triggering outcome transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: PreloadingTriggeringOutcome,
        to: PreloadingTriggeringOutcome,
    },

    /// Failure reason can only be set once.
    #[error("failure reason already set to {current:?}")]
    FailureReasonAlreadySet { current: PreloadingFailureReason },

    /// A field was explicitly set back to its unspecified value.
    #[error("{field} cannot be set to Unspecified")]
    UnspecifiedValue { field: &'static str },

    /// Prediction confidence must lie in 0..=100.
    #[error("prediction confidence {0} outside 0..=100")]
    ConfidenceOutOfRange(i64),

    /// Cookie copy events arrived out of order.
    #[error("cookie copy {operation} called while {state:?}")]
    CookieCopyOutOfOrder {
        operation: &'static str,
        state: CookieCopyState,
    },
}

/// Log a contract violation and hand it back for propagation.
///
/// Debug builds treat every violation as fatal.
pub(crate) fn report_violation(violation: ContractViolation) -> ContractViolation {
    tracing::error!(%violation, "Preloading contract violation");
    if cfg!(debug_assertions) {
        panic!("preloading contract violation: {}", violation);
    }
    violation
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid INI.
    #[error("Failed to parse settings {path}: {message}")]
    Settings { path: PathBuf, message: String },

    /// A setting has a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Errors that can occur while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log filter directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The log file path has no file name.
    #[error("Invalid log file path: {0}")]
    InvalidPath(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let violation = ContractViolation::IllegalTransition {
            from: PreloadingTriggeringOutcome::Success,
            to: PreloadingTriggeringOutcome::Running,
        };
        assert_eq!(
            violation.to_string(),
            "illegal triggering outcome transition Success -> Running"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "prefetch.redirects_enabled".to_string(),
            value: "maybe".to_string(),
        };
        assert!(err.to_string().contains("prefetch.redirects_enabled"));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "contract violation"))]
    fn test_report_violation_is_fatal_in_debug() {
        let violation = report_violation(ContractViolation::ConfidenceOutOfRange(101));
        assert_eq!(violation, ContractViolation::ConfidenceOutOfRange(101));
    }
}

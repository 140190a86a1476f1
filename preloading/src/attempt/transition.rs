//! Triggering outcome transition table.
//!
//! ```text
//! Unspecified --> any other outcome
//! Running --> Ready | Failure | TriggeredButUpgradedToPrerender
//! Ready --> Success | Failure | TriggeredButUpgradedToPrerender
//! TriggeredButUpgradedToPrerender --> Failure
//! TriggeredButPending --> Running | Failure
//! Duplicate, Success, Failure, TriggeredButOutcomeUnknown: terminal
//! ```
//!
//! `Ready --> Failure` is legal: a response can turn out to be unusable after
//! it was marked ready.

use super::status::PreloadingTriggeringOutcome;
use crate::error::ContractViolation;

/// Check whether `from --> to` is a legal outcome transition.
///
/// Pure; does not log or assert. Callers decide how to report.
pub fn check_transition(
    from: PreloadingTriggeringOutcome,
    to: PreloadingTriggeringOutcome,
) -> Result<(), ContractViolation> {
    use PreloadingTriggeringOutcome::*;

    let legal = match from {
        Unspecified => to != Unspecified,
        Running => matches!(to, Ready | Failure | TriggeredButUpgradedToPrerender),
        Ready => matches!(to, Success | Failure | TriggeredButUpgradedToPrerender),
        TriggeredButUpgradedToPrerender => to == Failure,
        TriggeredButPending => matches!(to, Running | Failure),
        Duplicate | Success | Failure | TriggeredButOutcomeUnknown => false,
    };

    if legal {
        Ok(())
    } else {
        Err(ContractViolation::IllegalTransition { from, to })
    }
}

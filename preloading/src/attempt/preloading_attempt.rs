//! The lifecycle object backing each attempt.

use std::time::{Duration, Instant};

use url::Url;

use super::status::{
    PreloadingEligibility, PreloadingFailureReason, PreloadingHoldbackStatus,
    PreloadingTriggeringOutcome,
};
use super::transition::check_transition;
use crate::config::PreloadingConfig;
use crate::error::{report_violation, ContractViolation};
use crate::types::{PreloadingPredictor, PreloadingType, UrlMatcher};

/// One actual speculative action and its lifecycle.
///
/// Fields advance in a fixed order:
///
/// ```text
/// eligibility (once) --> holdback_status (once, only if Eligible)
///     --> triggering_outcome (only if Allowed, per transition table)
///     --> failure_reason (once, forces Failure)
/// ```
///
/// Every setter returns `Err(ContractViolation)` and leaves the attempt
/// unchanged when the order is broken. Violations panic in debug builds.
#[derive(Debug)]
pub struct PreloadingAttempt {
    predictor: PreloadingPredictor,
    preloading_type: PreloadingType,
    url_matcher: UrlMatcher,
    eligibility: PreloadingEligibility,
    holdback_status: PreloadingHoldbackStatus,
    holdback_override: Option<PreloadingHoldbackStatus>,
    triggering_outcome: PreloadingTriggeringOutcome,
    failure_reason: PreloadingFailureReason,
    is_accurate_triggering: bool,
    triggered_at: Instant,
    ready_time: Option<Duration>,
}

impl PreloadingAttempt {
    pub fn new(
        predictor: PreloadingPredictor,
        preloading_type: PreloadingType,
        url_matcher: UrlMatcher,
    ) -> Self {
        Self {
            predictor,
            preloading_type,
            url_matcher,
            eligibility: PreloadingEligibility::Unspecified,
            holdback_status: PreloadingHoldbackStatus::Unspecified,
            holdback_override: None,
            triggering_outcome: PreloadingTriggeringOutcome::Unspecified,
            failure_reason: PreloadingFailureReason::Unspecified,
            is_accurate_triggering: false,
            triggered_at: Instant::now(),
            ready_time: None,
        }
    }

    pub fn predictor(&self) -> PreloadingPredictor {
        self.predictor
    }

    pub fn preloading_type(&self) -> PreloadingType {
        self.preloading_type
    }

    pub fn eligibility(&self) -> PreloadingEligibility {
        self.eligibility
    }

    pub fn holdback_status(&self) -> PreloadingHoldbackStatus {
        self.holdback_status
    }

    pub fn triggering_outcome(&self) -> PreloadingTriggeringOutcome {
        self.triggering_outcome
    }

    pub fn failure_reason(&self) -> PreloadingFailureReason {
        self.failure_reason
    }

    pub fn is_accurate_triggering(&self) -> bool {
        self.is_accurate_triggering
    }

    /// Time from creation to the first `Ready` outcome.
    pub fn ready_time(&self) -> Option<Duration> {
        self.ready_time
    }

    /// Record whether the environment permits this attempt.
    ///
    /// Any value other than `Eligible` ends the attempt's lifecycle.
    pub fn set_eligibility(
        &mut self,
        eligibility: PreloadingEligibility,
    ) -> Result<(), ContractViolation> {
        if eligibility == PreloadingEligibility::Unspecified {
            return Err(report_violation(ContractViolation::UnspecifiedValue {
                field: "eligibility",
            }));
        }
        if self.eligibility != PreloadingEligibility::Unspecified {
            return Err(report_violation(
                ContractViolation::EligibilityAlreadySet {
                    current: self.eligibility,
                },
            ));
        }

        tracing::debug!(
            predictor = %self.predictor,
            preloading_type = %self.preloading_type,
            ?eligibility,
            "Attempt eligibility set"
        );
        self.eligibility = eligibility;
        Ok(())
    }

    /// Record the holdback decision for an eligible attempt.
    pub fn set_holdback_status(
        &mut self,
        status: PreloadingHoldbackStatus,
    ) -> Result<(), ContractViolation> {
        if status == PreloadingHoldbackStatus::Unspecified {
            return Err(report_violation(ContractViolation::UnspecifiedValue {
                field: "holdback_status",
            }));
        }
        if self.eligibility != PreloadingEligibility::Eligible {
            return Err(report_violation(
                ContractViolation::HoldbackBeforeEligible {
                    eligibility: self.eligibility,
                },
            ));
        }
        if self.holdback_status != PreloadingHoldbackStatus::Unspecified {
            return Err(report_violation(ContractViolation::HoldbackAlreadySet {
                current: self.holdback_status,
            }));
        }

        tracing::debug!(
            predictor = %self.predictor,
            preloading_type = %self.preloading_type,
            ?status,
            "Attempt holdback status set"
        );
        self.holdback_status = status;
        Ok(())
    }

    /// Force the holdback decision regardless of configuration.
    ///
    /// Takes effect the next time [`should_holdback`](Self::should_holdback)
    /// resolves an undecided attempt.
    pub fn set_holdback_override(&mut self, status: PreloadingHoldbackStatus) {
        self.holdback_override = Some(status);
    }

    /// Resolve and record whether this attempt is held back.
    ///
    /// The first call decides from the override or `config` and stores the
    /// result; later calls return the stored decision. The attempt must be
    /// eligible.
    pub fn should_holdback(&mut self, config: &PreloadingConfig) -> Result<bool, ContractViolation> {
        if self.holdback_status == PreloadingHoldbackStatus::Unspecified {
            let status = match self.holdback_override {
                Some(status) if status != PreloadingHoldbackStatus::Unspecified => status,
                _ if config.should_holdback(self.preloading_type, self.predictor) => {
                    PreloadingHoldbackStatus::Holdback
                }
                _ => PreloadingHoldbackStatus::Allowed,
            };
            self.set_holdback_status(status)?;
        }
        Ok(self.holdback_status == PreloadingHoldbackStatus::Holdback)
    }

    /// Advance the triggering outcome along the transition table.
    pub fn set_triggering_outcome(
        &mut self,
        outcome: PreloadingTriggeringOutcome,
    ) -> Result<(), ContractViolation> {
        if self.holdback_status != PreloadingHoldbackStatus::Allowed {
            return Err(report_violation(
                ContractViolation::OutcomeWithoutAllowed {
                    holdback: self.holdback_status,
                },
            ));
        }
        check_transition(self.triggering_outcome, outcome).map_err(report_violation)?;

        tracing::debug!(
            predictor = %self.predictor,
            preloading_type = %self.preloading_type,
            from = ?self.triggering_outcome,
            to = ?outcome,
            "Attempt outcome transition"
        );
        self.triggering_outcome = outcome;
        if outcome == PreloadingTriggeringOutcome::Ready && self.ready_time.is_none() {
            self.ready_time = Some(self.triggered_at.elapsed());
        }
        Ok(())
    }

    /// Record why the attempt failed, moving it to `Failure`.
    pub fn set_failure_reason(
        &mut self,
        reason: PreloadingFailureReason,
    ) -> Result<(), ContractViolation> {
        if reason == PreloadingFailureReason::Unspecified {
            return Err(report_violation(ContractViolation::UnspecifiedValue {
                field: "failure_reason",
            }));
        }
        if self.failure_reason != PreloadingFailureReason::Unspecified {
            return Err(report_violation(
                ContractViolation::FailureReasonAlreadySet {
                    current: self.failure_reason,
                },
            ));
        }
        if self.triggering_outcome != PreloadingTriggeringOutcome::Failure {
            self.set_triggering_outcome(PreloadingTriggeringOutcome::Failure)?;
        }
        self.failure_reason = reason;
        Ok(())
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.url_matcher.matches(url)
    }

    pub(crate) fn set_is_accurate_triggering(&mut self, accurate: bool) {
        self.is_accurate_triggering = accurate;
    }
}

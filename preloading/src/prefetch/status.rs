//! Fine-grained prefetch status and its mapping onto the attempt state machine.

use serde::Serialize;

use crate::attempt::{PreloadingEligibility, PreloadingFailureReason, PreloadingTriggeringOutcome};

/// Why a prefetch is not eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrefetchIneligibility {
    /// The host does not resolve to a unique public name.
    HostIsNonUnique,
    /// Cross-site targets must be https.
    SchemeIsNotHttps,
    /// A service worker controls the target.
    HasServiceWorker,
    /// The user already has cookies for the cross-site target.
    UserHasCookies,
    /// A proxy is already configured.
    ExistingProxy,
    /// Off-the-record profile.
    OffTheRecord,
    /// Data saver mode is on.
    DataSaverEnabled,
    /// A previous response asked us to back off (`Retry-After`).
    RetryAfter,
    /// The private prefetch proxy cannot be reached.
    ProxyNotAvailable,
}

impl PrefetchIneligibility {
    /// The attempt eligibility recorded for this reason.
    pub fn to_eligibility(self) -> PreloadingEligibility {
        match self {
            PrefetchIneligibility::HostIsNonUnique => PreloadingEligibility::HostIsNonUnique,
            PrefetchIneligibility::SchemeIsNotHttps => PreloadingEligibility::SchemeIsNotHttps,
            PrefetchIneligibility::HasServiceWorker => PreloadingEligibility::HasServiceWorker,
            PrefetchIneligibility::UserHasCookies => PreloadingEligibility::UserHasCookies,
            PrefetchIneligibility::ExistingProxy => PreloadingEligibility::ExistingProxy,
            PrefetchIneligibility::OffTheRecord => PreloadingEligibility::OffTheRecord,
            PrefetchIneligibility::DataSaverEnabled => PreloadingEligibility::DataSaverEnabled,
            PrefetchIneligibility::RetryAfter => PreloadingEligibility::RetryAfter,
            PrefetchIneligibility::ProxyNotAvailable => PreloadingEligibility::ProxyNotAvailable,
        }
    }
}

/// Status of a single prefetch, finer than the attempt outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrefetchStatus {
    /// Created; eligibility not yet known.
    NotStarted,
    /// Rejected by the eligibility check.
    NotEligible(PrefetchIneligibility),
    /// Eligible and not held back.
    Allowed,
    /// Eligible but held back for counterfactual measurement.
    Heldback,
    /// Request in flight.
    NotFinishedInTime,
    /// Response fully received.
    Successful,
    /// Served after a successful availability probe.
    ResponseUsed,
    /// Served without probing.
    UsedNoProbe,
    /// Decoy that is never fetched.
    IsPrivacyDecoy,
    /// Redirected while redirects are off.
    FailedRedirectsDisabled,
    /// Network error, or completion without a response head.
    FailedNetError,
    /// Response status outside 2xx.
    FailedNon2xx,
    /// Response was not HTML.
    FailedMimeNotSupported,
    /// Availability check failed at serving time.
    NotUsedProbeFailed,
    /// Default-jar cookies for the URL changed before serving.
    NotUsedCookiesChanged,
    /// Cancelled by the owner.
    Cancelled,
}

/// What a status change means for the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptTransition {
    /// Status precedes or sits outside the outcome lifecycle.
    None,
    /// Record the eligibility failure.
    Ineligible(PreloadingEligibility),
    /// Move the attempt to this outcome.
    Outcome(PreloadingTriggeringOutcome),
    /// Served: move to `Success`, via `Ready` if not already there.
    Served,
    /// Fail the attempt with this reason.
    Failure(PreloadingFailureReason),
}

impl PrefetchStatus {
    pub fn attempt_transition(self) -> AttemptTransition {
        use PrefetchStatus::*;
        match self {
            NotStarted | Allowed | Heldback => AttemptTransition::None,
            NotEligible(reason) => AttemptTransition::Ineligible(reason.to_eligibility()),
            NotFinishedInTime => AttemptTransition::Outcome(PreloadingTriggeringOutcome::Running),
            Successful => AttemptTransition::Outcome(PreloadingTriggeringOutcome::Ready),
            ResponseUsed | UsedNoProbe => AttemptTransition::Served,
            IsPrivacyDecoy => AttemptTransition::Failure(PreloadingFailureReason::PrivacyDecoy),
            FailedRedirectsDisabled => {
                AttemptTransition::Failure(PreloadingFailureReason::RedirectsDisabled)
            }
            FailedNetError => AttemptTransition::Failure(PreloadingFailureReason::NetError),
            FailedNon2xx => AttemptTransition::Failure(PreloadingFailureReason::Non2xxStatus),
            FailedMimeNotSupported => {
                AttemptTransition::Failure(PreloadingFailureReason::MimeNotSupported)
            }
            NotUsedProbeFailed => AttemptTransition::Failure(PreloadingFailureReason::ProbeFailed),
            NotUsedCookiesChanged => {
                AttemptTransition::Failure(PreloadingFailureReason::CookiesChanged)
            }
            Cancelled => AttemptTransition::Failure(PreloadingFailureReason::Cancelled),
        }
    }

    /// Statuses after which the container takes no further events.
    pub fn is_terminal(self) -> bool {
        matches!(
            self.attempt_transition(),
            AttemptTransition::Ineligible(_) | AttemptTransition::Failure(_) | AttemptTransition::Served
        ) || self == PrefetchStatus::Heldback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ineligibility_maps_to_eligibility() {
        let status = PrefetchStatus::NotEligible(PrefetchIneligibility::UserHasCookies);
        assert_eq!(
            status.attempt_transition(),
            AttemptTransition::Ineligible(PreloadingEligibility::UserHasCookies)
        );
        assert!(status.is_terminal());
    }

    #[test]
    fn test_lifecycle_mapping() {
        assert_eq!(
            PrefetchStatus::NotFinishedInTime.attempt_transition(),
            AttemptTransition::Outcome(PreloadingTriggeringOutcome::Running)
        );
        assert_eq!(
            PrefetchStatus::Successful.attempt_transition(),
            AttemptTransition::Outcome(PreloadingTriggeringOutcome::Ready)
        );
        assert_eq!(
            PrefetchStatus::UsedNoProbe.attempt_transition(),
            AttemptTransition::Served
        );
        assert_eq!(
            PrefetchStatus::Allowed.attempt_transition(),
            AttemptTransition::None
        );
    }

    #[test]
    fn test_failures_preserve_reason() {
        assert_eq!(
            PrefetchStatus::FailedMimeNotSupported.attempt_transition(),
            AttemptTransition::Failure(PreloadingFailureReason::MimeNotSupported)
        );
        assert_eq!(
            PrefetchStatus::IsPrivacyDecoy.attempt_transition(),
            AttemptTransition::Failure(PreloadingFailureReason::PrivacyDecoy)
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!PrefetchStatus::NotStarted.is_terminal());
        assert!(!PrefetchStatus::NotFinishedInTime.is_terminal());
        assert!(!PrefetchStatus::Successful.is_terminal());
        assert!(PrefetchStatus::Heldback.is_terminal());
        assert!(PrefetchStatus::ResponseUsed.is_terminal());
        assert!(PrefetchStatus::Cancelled.is_terminal());
    }
}

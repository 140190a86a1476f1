//! Status enums carried by a preloading attempt.

use serde::Serialize;

/// Whether environment and policy permit the attempt at all.
///
/// Everything other than `Unspecified` and `Eligible` is a terminal
/// ineligibility reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreloadingEligibility {
    /// Not yet determined.
    Unspecified,
    /// Permitted; holdback is decided next.
    Eligible,
    /// Script is disabled for the triggering page.
    JavaScriptDisabled,
    /// The device is under memory pressure.
    LowMemory,
    /// Battery saver mode is on.
    BatterySaverEnabled,
    /// The user turned preloading off.
    PreloadingDisabled,
    /// Data saver mode is on.
    DataSaverEnabled,
    /// The target host does not resolve to a unique public name.
    HostIsNonUnique,
    /// Cross-site prefetch requires an https target.
    SchemeIsNotHttps,
    /// A service worker controls the target.
    HasServiceWorker,
    /// Cross-site target where the user already has cookies.
    UserHasCookies,
    /// A proxy is already configured for the browser.
    ExistingProxy,
    /// Off-the-record profiles do not preload.
    OffTheRecord,
    /// The origin asked for a back-off period that has not passed.
    RetryAfter,
    /// The private prefetch proxy cannot be reached.
    ProxyNotAvailable,
}

impl PreloadingEligibility {
    /// True for every terminal ineligibility reason.
    pub fn is_ineligible(&self) -> bool {
        !matches!(
            self,
            PreloadingEligibility::Unspecified | PreloadingEligibility::Eligible
        )
    }
}

/// Counterfactual holdback decision for an eligible attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreloadingHoldbackStatus {
    /// Not yet decided.
    Unspecified,
    /// Eligible but deliberately not triggered.
    Holdback,
    /// Triggered normally.
    Allowed,
}

/// Lifecycle status of a triggered attempt.
///
/// See [`check_transition`](super::check_transition) for the legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreloadingTriggeringOutcome {
    /// Not triggered yet.
    Unspecified,
    /// An equivalent attempt already exists.
    Duplicate,
    /// Request in flight.
    Running,
    /// Response available; may still fail before use.
    Ready,
    /// Served to the navigation.
    Success,
    /// Gave up; see the failure reason.
    Failure,
    /// Triggered in a context that cannot report back.
    TriggeredButOutcomeUnknown,
    /// A prerender took over this prefetch.
    TriggeredButUpgradedToPrerender,
    /// Queued behind other work.
    TriggeredButPending,
}

impl PreloadingTriggeringOutcome {
    /// All outcomes, in declaration order.
    pub fn all() -> &'static [PreloadingTriggeringOutcome] {
        use PreloadingTriggeringOutcome::*;
        &[
            Unspecified,
            Duplicate,
            Running,
            Ready,
            Success,
            Failure,
            TriggeredButOutcomeUnknown,
            TriggeredButUpgradedToPrerender,
            TriggeredButPending,
        ]
    }

    /// Outcomes with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PreloadingTriggeringOutcome::Duplicate
                | PreloadingTriggeringOutcome::Success
                | PreloadingTriggeringOutcome::Failure
                | PreloadingTriggeringOutcome::TriggeredButOutcomeUnknown
        )
    }
}

/// Why a triggered attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreloadingFailureReason {
    /// No failure recorded.
    Unspecified,
    /// Cancelled by the trigger or the owner.
    Cancelled,
    /// The trigger was removed while the preload was running.
    TriggerDestroyed,
    /// Ready, but rejected when it came to serving.
    ReadyButUnusable,
    /// Kept as a decoy and never fetched.
    PrivacyDecoy,
    /// The response redirected and redirects are off.
    RedirectsDisabled,
    /// The request failed at the network layer.
    NetError,
    /// The response status was outside 2xx.
    Non2xxStatus,
    /// The response was not an HTML document.
    MimeNotSupported,
    /// The pre-use availability check failed.
    ProbeFailed,
    /// Default-jar cookies for the URL changed after the fetch.
    CookiesChanged,
}

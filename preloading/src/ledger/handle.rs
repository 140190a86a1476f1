//! Non-owning handles to attempts held by the ledger.

use std::sync::Weak;

use parking_lot::Mutex;

use super::preloading_data::PreloadingLedger;
use crate::attempt::{
    PreloadingAttempt, PreloadingEligibility, PreloadingFailureReason, PreloadingHoldbackStatus,
    PreloadingTriggeringOutcome,
};
use crate::error::ContractViolation;

/// Position of an attempt within one ledger generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct AttemptId {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

/// Handle to an attempt owned by a [`PreloadingData`](super::PreloadingData).
///
/// The ledger remains the sole owner. A handle resolves to nothing once the
/// ledger has flushed the attempt or been dropped, so the prefetch container
/// and the reconciler can outlive it safely. Setters on an empty handle are
/// silently ignored.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    ledger: Weak<Mutex<PreloadingLedger>>,
    id: AttemptId,
}

impl AttemptHandle {
    pub(crate) fn new(ledger: Weak<Mutex<PreloadingLedger>>, id: AttemptId) -> Self {
        Self { ledger, id }
    }

    /// An empty handle that never resolves.
    pub fn detached() -> Self {
        Self {
            ledger: Weak::new(),
            id: AttemptId {
                generation: u64::MAX,
                index: usize::MAX,
            },
        }
    }

    /// Run `f` against the attempt if it still exists.
    ///
    /// The ledger lock is held for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut PreloadingAttempt) -> R) -> Option<R> {
        let ledger = self.ledger.upgrade()?;
        let mut ledger = ledger.lock();
        ledger.attempt_mut(self.id).map(f)
    }

    /// Whether the attempt still exists.
    pub fn is_live(&self) -> bool {
        self.with(|_| ()).is_some()
    }

    pub fn set_eligibility(
        &self,
        eligibility: PreloadingEligibility,
    ) -> Result<(), ContractViolation> {
        self.with(|a| a.set_eligibility(eligibility))
            .unwrap_or(Ok(()))
    }

    pub fn set_holdback_status(
        &self,
        status: PreloadingHoldbackStatus,
    ) -> Result<(), ContractViolation> {
        self.with(|a| a.set_holdback_status(status))
            .unwrap_or(Ok(()))
    }

    pub fn set_holdback_override(&self, status: PreloadingHoldbackStatus) {
        self.with(|a| a.set_holdback_override(status));
    }

    /// Resolve the holdback decision against the ledger's configuration.
    ///
    /// Returns `None` for an empty handle.
    pub fn should_holdback(&self) -> Option<Result<bool, ContractViolation>> {
        let ledger = self.ledger.upgrade()?;
        let mut ledger = ledger.lock();
        ledger.attempt_should_holdback(self.id)
    }

    pub fn set_triggering_outcome(
        &self,
        outcome: PreloadingTriggeringOutcome,
    ) -> Result<(), ContractViolation> {
        self.with(|a| a.set_triggering_outcome(outcome))
            .unwrap_or(Ok(()))
    }

    pub fn set_failure_reason(
        &self,
        reason: PreloadingFailureReason,
    ) -> Result<(), ContractViolation> {
        self.with(|a| a.set_failure_reason(reason))
            .unwrap_or(Ok(()))
    }

    pub fn eligibility(&self) -> Option<PreloadingEligibility> {
        self.with(|a| a.eligibility())
    }

    pub fn holdback_status(&self) -> Option<PreloadingHoldbackStatus> {
        self.with(|a| a.holdback_status())
    }

    pub fn triggering_outcome(&self) -> Option<PreloadingTriggeringOutcome> {
        self.with(|a| a.triggering_outcome())
    }

    pub fn failure_reason(&self) -> Option<PreloadingFailureReason> {
        self.with(|a| a.failure_reason())
    }
}

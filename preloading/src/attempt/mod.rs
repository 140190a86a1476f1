//! Attempt state machine.
//!
//! A [`PreloadingAttempt`] represents one actual speculative action. Its
//! fields advance monotonically: eligibility, then holdback, then the
//! triggering outcome along the table in [`check_transition`], with an
//! optional failure reason that forces `Failure`.

mod preloading_attempt;
mod status;
mod transition;

pub use preloading_attempt::PreloadingAttempt;
pub use status::{
    PreloadingEligibility, PreloadingFailureReason, PreloadingHoldbackStatus,
    PreloadingTriggeringOutcome,
};
pub use transition::check_transition;

//! Prefetch container.
//!
//! A [`PrefetchContainer`] tracks one prefetch from eligibility to use,
//! translating its fine-grained [`PrefetchStatus`] onto the coarse attempt
//! state machine:
//!
//! ```text
//! NotStarted ──eligibility──► NotEligible(reason)                 (terminal)
//!     │
//!     └──► Allowed | Heldback
//!             │
//!             └─start─► NotFinishedInTime ──complete──► Successful
//!                            │                              │
//!                            ├──► Failed* / Cancelled       ├──► ResponseUsed | UsedNoProbe
//!                            └──► ResponseUsed | UsedNoProbe└──► NotUsed*
//! ```
//!
//! # Module Structure
//!
//! - `status` - `PrefetchStatus` and its attempt mapping
//! - `prefetch_type` - proxying and eagerness parameters
//! - `loader` - streaming response loader and network events
//! - `cookies` - isolated cookie copy and cookie change listening
//! - `deletion` - deferred deletion of loaders released mid-callback
//! - `container` - the container itself

mod container;
mod cookies;
mod deletion;
mod loader;
mod prefetch_type;
mod status;

pub use container::{PrefetchContainer, ProbeResult, ServableState};
pub use cookies::{CookieCopyState, CookieCopyTimings, CookieListener, IsolatedCookieCopy};
pub use deletion::{DeletionQueue, DeletionSender};
pub use loader::{
    CompletionStatus, LoaderEvent, LoaderState, ResponseHead, ResponseSizes, StreamingLoader,
};
pub use prefetch_type::{PrefetchType, SpeculationEagerness};
pub use status::{AttemptTransition, PrefetchIneligibility, PrefetchStatus};

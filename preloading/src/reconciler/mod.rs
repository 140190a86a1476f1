//! Candidate reconciliation for prerenders.
//!
//! A document's speculation candidates change over time. Each update is
//! diffed against the prerenders already started:
//!
//! ```text
//! candidates (sorted by URL)     started (sorted by URL)
//!        a  b     d                  a     c  d
//!        │  │     │                  │     │  │
//!        └──┼─────┼── keep ──────────┘     │  │
//!           └─────┼── start                │  │
//!                 │            cancel ─────┘  │
//!                 └── keep ───────────────────┘
//! ```
//!
//! Only one prerender runs per URL; a registry refusal is remembered until
//! the candidate disappears.

mod candidate;
mod reconcile;

pub use candidate::{Candidate, PrerenderHostId, SpeculationAction, StartedPrerender};
pub use reconcile::{CandidateReconciler, PrerenderHostRegistry, ReconcileOutcome};

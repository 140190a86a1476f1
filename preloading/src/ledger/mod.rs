//! Attempt and prediction ledger.
//!
//! [`PreloadingData`] owns every [`PreloadingAttempt`](crate::attempt::PreloadingAttempt)
//! and [`PreloadingPrediction`] created for the current navigation context.
//! Everything else refers to attempts through [`AttemptHandle`], which
//! resolves to nothing once the ledger has flushed or been dropped.
//!
//! # Flush points
//!
//! ```text
//! did_start_navigation(url)       evaluate every predicate against url
//! did_finish_navigation(Some(..)) emit records (navigated + triggering page)
//! did_finish_navigation(None)     discard tentative accuracy
//! drop                            emit remaining records (triggering page, inaccurate)
//! ```

mod handle;
mod prediction;
mod preloading_data;

pub use handle::AttemptHandle;
pub use prediction::PreloadingPrediction;
pub use preloading_data::{PreloadingData, MAX_CONFIDENCE};

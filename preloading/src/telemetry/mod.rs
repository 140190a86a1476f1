//! Preloading telemetry.
//!
//! Records are flat, typed, and serializable. They are produced at two
//! points only: when the ledger flushes (navigation commit or teardown) and
//! when a prefetch container is destroyed.
//!
//! ```text
//! PreloadingData ──┐
//!                  ├──► TelemetryRecord ──► TelemetryRecorder
//! PrefetchContainer┘                        (tracing, memory, JSON lines)
//! ```

mod record;
mod recorder;

pub use record::{
    AttemptRecord, PredictionRecord, PrefetchRecord, RecallRecord, RecordAnchor,
    TelemetryRecord,
};
pub(crate) use record::duration_ms;
pub use recorder::{InMemoryRecorder, JsonLinesRecorder, TelemetryRecorder, TracingRecorder};

//! Telemetry sinks.
//!
//! The core never transports telemetry itself; it hands each finished record
//! to an injected [`TelemetryRecorder`].

use std::io::Write;

use parking_lot::Mutex;

use super::record::{
    AttemptRecord, PredictionRecord, PrefetchRecord, RecallRecord, TelemetryRecord,
};

/// Receives finished telemetry records.
pub trait TelemetryRecorder: Send + Sync {
    fn record(&self, record: TelemetryRecord);
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl TelemetryRecorder for TracingRecorder {
    fn record(&self, record: TelemetryRecord) {
        match &record {
            TelemetryRecord::Attempt(r) => tracing::info!(
                target: "preloading::telemetry",
                anchor = ?r.anchor,
                predictor = %r.predictor,
                preloading_type = %r.preloading_type,
                eligibility = ?r.eligibility,
                holdback_status = ?r.holdback_status,
                triggering_outcome = ?r.triggering_outcome,
                failure_reason = ?r.failure_reason,
                accurate = r.is_accurate_triggering,
                ready_time_ms = ?r.ready_time_ms,
                sampling_likelihood = r.sampling_likelihood,
                "Preloading attempt"
            ),
            TelemetryRecord::Prediction(r) => tracing::info!(
                target: "preloading::telemetry",
                anchor = ?r.anchor,
                predictor = %r.predictor,
                confidence = r.confidence,
                accurate = r.is_accurate,
                "Preloading prediction"
            ),
            TelemetryRecord::Recall(r) => tracing::info!(
                target: "preloading::telemetry",
                page_id = %r.page_id,
                predictor = %r.predictor,
                true_positive = r.is_true_positive,
                "Preloading recall"
            ),
            TelemetryRecord::Prefetch(r) => tracing::info!(
                target: "preloading::telemetry",
                status = ?r.status,
                link_clicked = r.link_clicked,
                data_length = ?r.data_length,
                fetch_duration_ms = ?r.fetch_duration_ms,
                cookie_copy_total_ms = ?r.cookie_copy_total_ms,
                "Prefetch resource"
            ),
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<TelemetryRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TelemetryRecord::Attempt(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn predictions(&self) -> Vec<PredictionRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TelemetryRecord::Prediction(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn recalls(&self) -> Vec<RecallRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TelemetryRecord::Recall(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn prefetches(&self) -> Vec<PrefetchRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TelemetryRecord::Prefetch(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TelemetryRecorder for InMemoryRecorder {
    fn record(&self, record: TelemetryRecord) {
        self.records.lock().push(record);
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesRecorder<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the recorder and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> TelemetryRecorder for JsonLinesRecorder<W> {
    fn record(&self, record: TelemetryRecord) {
        let mut writer = self.writer.lock();
        let result = serde_json::to_writer(&mut *writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write telemetry record");
        }
    }
}

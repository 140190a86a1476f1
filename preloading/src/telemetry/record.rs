//! Flat, typed telemetry records.

use std::time::Duration;

use serde::Serialize;

use crate::attempt::{
    PreloadingAttempt, PreloadingEligibility, PreloadingFailureReason, PreloadingHoldbackStatus,
    PreloadingTriggeringOutcome,
};
use crate::prefetch::{PrefetchStatus, PrefetchType};
use crate::types::{PageId, PreloadingPredictor, PreloadingType};

/// Which page a record is attributed to.
///
/// Every attempt and prediction is reported once against the page the user
/// navigated to and once against the page that triggered the preload, so
/// the impact on each can be analysed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page_id", rename_all = "snake_case")]
pub enum RecordAnchor {
    /// The page the navigation committed to.
    NavigatedPage(PageId),
    /// The page that triggered the preload.
    TriggeringPage(PageId),
}

/// Final state of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub anchor: RecordAnchor,
    pub predictor: PreloadingPredictor,
    pub preloading_type: PreloadingType,
    pub eligibility: PreloadingEligibility,
    pub holdback_status: PreloadingHoldbackStatus,
    pub triggering_outcome: PreloadingTriggeringOutcome,
    pub failure_reason: PreloadingFailureReason,
    pub is_accurate_triggering: bool,
    pub ready_time_ms: Option<u64>,
    pub sampling_likelihood: f64,
}

impl AttemptRecord {
    pub(crate) fn from_attempt(
        attempt: &PreloadingAttempt,
        anchor: RecordAnchor,
        sampling_likelihood: f64,
    ) -> Self {
        Self {
            anchor,
            predictor: attempt.predictor(),
            preloading_type: attempt.preloading_type(),
            eligibility: attempt.eligibility(),
            holdback_status: attempt.holdback_status(),
            triggering_outcome: attempt.triggering_outcome(),
            failure_reason: attempt.failure_reason(),
            is_accurate_triggering: attempt.is_accurate_triggering(),
            ready_time_ms: attempt.ready_time().map(duration_ms),
            sampling_likelihood,
        }
    }
}

/// One predictor guess and whether it was right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionRecord {
    pub anchor: RecordAnchor,
    pub predictor: PreloadingPredictor,
    pub confidence: u8,
    pub is_accurate: bool,
}

/// Whether a predictor covered a navigation that fell in its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecallRecord {
    pub page_id: PageId,
    pub predictor: PreloadingPredictor,
    pub is_true_positive: bool,
}

/// Summary emitted when a prefetch container is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefetchRecord {
    pub prefetch_type: PrefetchType,
    pub status: Option<PrefetchStatus>,
    pub link_clicked: bool,
    pub data_length: Option<u64>,
    pub fetch_duration_ms: Option<u64>,
    pub cookie_read_ms: Option<u64>,
    pub cookie_write_ms: Option<u64>,
    pub cookie_copy_total_ms: Option<u64>,
}

/// Any record the core emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TelemetryRecord {
    /// One preloading attempt.
    Attempt(AttemptRecord),
    /// One prediction and whether it came true.
    Prediction(PredictionRecord),
    /// Whether a predictor covered an in-domain navigation.
    Recall(RecallRecord),
    /// Timings and sizes of one prefetch.
    Prefetch(PrefetchRecord),
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::predictors;

    #[test]
    fn test_prediction_record_json_shape() {
        let record = TelemetryRecord::Prediction(PredictionRecord {
            anchor: RecordAnchor::NavigatedPage(PageId(7)),
            predictor: predictors::SPECULATION_RULES,
            confidence: 80,
            is_accurate: true,
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record"], "prediction");
        assert_eq!(json["anchor"]["kind"], "navigated_page");
        assert_eq!(json["anchor"]["page_id"], 7);
        assert_eq!(json["predictor"]["name"], "SpeculationRules");
        assert_eq!(json["confidence"], 80);
        assert_eq!(json["is_accurate"], true);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::ZERO), 0);
    }
}

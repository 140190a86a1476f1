//! Per-navigation-context ledger of attempts and predictions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use super::handle::{AttemptHandle, AttemptId};
use super::prediction::PreloadingPrediction;
use crate::attempt::PreloadingAttempt;
use crate::config::{PreloadingConfig, RandomSampler, Sampler};
use crate::error::{report_violation, ContractViolation};
use crate::telemetry::{
    AttemptRecord, PredictionRecord, RecallRecord, RecordAnchor, TelemetryRecord,
    TelemetryRecorder,
};
use crate::types::{CommittedNavigation, PageId, PreloadingPredictor, PreloadingType, UrlMatcher};

/// Maximum prediction confidence.
pub const MAX_CONFIDENCE: i64 = 100;

/// State guarded by the ledger lock.
#[derive(Debug)]
pub(crate) struct PreloadingLedger {
    generation: u64,
    triggering_page: PageId,
    attempts: Vec<PreloadingAttempt>,
    predictions: Vec<PreloadingPrediction>,
    in_domain: HashMap<PreloadingPredictor, UrlMatcher>,
    config: Arc<PreloadingConfig>,
}

impl PreloadingLedger {
    pub(crate) fn attempt_mut(&mut self, id: AttemptId) -> Option<&mut PreloadingAttempt> {
        if id.generation != self.generation {
            return None;
        }
        self.attempts.get_mut(id.index)
    }

    pub(crate) fn attempt_should_holdback(
        &mut self,
        id: AttemptId,
    ) -> Option<Result<bool, ContractViolation>> {
        if id.generation != self.generation {
            return None;
        }
        let config = &self.config;
        let attempt = self.attempts.get_mut(id.index)?;
        Some(attempt.should_holdback(config))
    }

    fn evaluate(&mut self, url: &Url) {
        for prediction in &mut self.predictions {
            prediction.evaluate(url);
        }
        for attempt in &mut self.attempts {
            attempt.set_is_accurate_triggering(attempt.matches(url));
        }
    }

    fn reset_accuracy(&mut self) {
        for prediction in &mut self.predictions {
            prediction.reset_accuracy();
        }
        for attempt in &mut self.attempts {
            attempt.set_is_accurate_triggering(false);
        }
    }

    /// Build the records for everything held, in emission order.
    fn build_records(
        &self,
        committed: Option<&CommittedNavigation>,
        sampler: &dyn Sampler,
    ) -> Vec<TelemetryRecord> {
        let mut anchors = Vec::with_capacity(2);
        if let Some(navigation) = committed {
            anchors.push(RecordAnchor::NavigatedPage(navigation.page_id));
        }
        anchors.push(RecordAnchor::TriggeringPage(self.triggering_page));

        let mut records = Vec::new();

        for attempt in &self.attempts {
            let likelihood = self
                .config
                .sampling_likelihood(attempt.preloading_type(), attempt.predictor());
            if !sampler.sample(likelihood) {
                continue;
            }
            for &anchor in &anchors {
                records.push(TelemetryRecord::Attempt(AttemptRecord::from_attempt(
                    attempt, anchor, likelihood,
                )));
            }
        }

        for prediction in &self.predictions {
            for &anchor in &anchors {
                records.push(TelemetryRecord::Prediction(PredictionRecord {
                    anchor,
                    predictor: prediction.predictor(),
                    confidence: prediction.confidence(),
                    is_accurate: prediction.is_accurate(),
                }));
            }
        }

        if let Some(navigation) = committed {
            for (predictor, matcher) in &self.in_domain {
                if !matcher.matches(&navigation.url) {
                    continue;
                }
                let is_true_positive = self
                    .predictions
                    .iter()
                    .any(|p| p.predictor() == *predictor && p.is_accurate());
                records.push(TelemetryRecord::Recall(RecallRecord {
                    page_id: navigation.page_id,
                    predictor: *predictor,
                    is_true_positive,
                }));
            }
        }

        records
    }

    /// Start a fresh generation anchored to `page`; outstanding handles go empty.
    fn reset(&mut self, page: PageId) {
        self.generation += 1;
        self.triggering_page = page;
        self.attempts.clear();
        self.predictions.clear();
        self.in_domain.clear();
    }
}

/// Owner of every attempt and prediction for one navigation context.
///
/// Predictors add predictions and attempts; the navigation layer reports
/// `did_start_navigation` and `did_finish_navigation`. On commit every
/// record is flushed twice: once anchored to the navigated page and once to
/// the page that triggered the preload. Dropping the ledger flushes whatever
/// is left, anchored to the triggering page only.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use preloading::config::PreloadingConfig;
/// use preloading::ledger::PreloadingData;
/// use preloading::telemetry::InMemoryRecorder;
/// use preloading::types::{predictors, CommittedNavigation, PageId, UrlMatcher};
/// use url::Url;
///
/// let recorder = Arc::new(InMemoryRecorder::new());
/// let data = PreloadingData::new(PageId(1), Arc::new(PreloadingConfig::new()), recorder.clone());
///
/// let next = Url::parse("https://example.com/next").unwrap();
/// data.add_preloading_prediction(predictors::LINK_REL, 90, UrlMatcher::same_url(next.clone()));
///
/// data.did_start_navigation(&next);
/// data.did_finish_navigation(Some(&CommittedNavigation::new(next, PageId(2))));
///
/// let predictions = recorder.predictions();
/// assert_eq!(predictions.len(), 2);
/// assert!(predictions.iter().all(|p| p.is_accurate));
/// ```
pub struct PreloadingData {
    ledger: Arc<Mutex<PreloadingLedger>>,
    recorder: Arc<dyn TelemetryRecorder>,
    sampler: Arc<dyn Sampler>,
}

impl PreloadingData {
    /// Create a ledger for preloads triggered from `triggering_page`.
    pub fn new(
        triggering_page: PageId,
        config: Arc<PreloadingConfig>,
        recorder: Arc<dyn TelemetryRecorder>,
    ) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(PreloadingLedger {
                generation: 0,
                triggering_page,
                attempts: Vec::new(),
                predictions: Vec::new(),
                in_domain: HashMap::new(),
                config,
            })),
            recorder,
            sampler: Arc::new(RandomSampler),
        }
    }

    /// Replace the sampler used for attempt records.
    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Record an attempt and return a handle for driving its lifecycle.
    pub fn add_preloading_attempt(
        &self,
        predictor: PreloadingPredictor,
        preloading_type: PreloadingType,
        url_matcher: UrlMatcher,
    ) -> AttemptHandle {
        let mut ledger = self.ledger.lock();
        let id = AttemptId {
            generation: ledger.generation,
            index: ledger.attempts.len(),
        };
        ledger
            .attempts
            .push(PreloadingAttempt::new(predictor, preloading_type, url_matcher));

        tracing::debug!(
            predictor = %predictor,
            preloading_type = %preloading_type,
            index = id.index,
            "Preloading attempt added"
        );
        AttemptHandle::new(Arc::downgrade(&self.ledger), id)
    }

    /// Record a predictor guess.
    ///
    /// Confidence outside 0..=100 is a contract violation and is clamped.
    pub fn add_preloading_prediction(
        &self,
        predictor: PreloadingPredictor,
        confidence: i64,
        url_matcher: UrlMatcher,
    ) {
        if !(0..=MAX_CONFIDENCE).contains(&confidence) {
            report_violation(ContractViolation::ConfidenceOutOfRange(confidence));
        }
        let confidence = u8::try_from(confidence.clamp(0, MAX_CONFIDENCE)).unwrap_or(100);

        self.ledger
            .lock()
            .predictions
            .push(PreloadingPrediction::new(predictor, confidence, url_matcher));
        tracing::debug!(predictor = %predictor, confidence, "Preloading prediction added");
    }

    /// Register which navigations `predictor` is expected to cover.
    ///
    /// Used to report recall for navigations the predictor missed.
    pub fn set_is_navigation_in_domain(&self, predictor: PreloadingPredictor, matcher: UrlMatcher) {
        self.ledger.lock().in_domain.insert(predictor, matcher);
    }

    /// Evaluate every prediction and attempt against the navigation target.
    pub fn did_start_navigation(&self, url: &Url) {
        self.ledger.lock().evaluate(url);
        tracing::debug!(url = %url, "Evaluated preloading accuracy");
    }

    /// Flush telemetry for a committed navigation.
    ///
    /// `None` means the navigation did not commit: the accuracy computed at
    /// start is discarded and nothing is flushed.
    pub fn did_finish_navigation(&self, committed: Option<&CommittedNavigation>) {
        let Some(navigation) = committed else {
            self.ledger.lock().reset_accuracy();
            tracing::debug!("Navigation did not commit - accuracy discarded");
            return;
        };

        let records = {
            let mut ledger = self.ledger.lock();
            let records = ledger.build_records(Some(navigation), self.sampler.as_ref());
            ledger.reset(navigation.page_id);
            records
        };

        tracing::debug!(
            url = %navigation.url,
            page_id = %navigation.page_id,
            records = records.len(),
            "Flushing preloading telemetry"
        );
        self.emit(records);
    }

    pub fn triggering_page(&self) -> PageId {
        self.ledger.lock().triggering_page
    }

    pub fn attempt_count(&self) -> usize {
        self.ledger.lock().attempts.len()
    }

    pub fn prediction_count(&self) -> usize {
        self.ledger.lock().predictions.len()
    }

    fn emit(&self, records: Vec<TelemetryRecord>) {
        for record in records {
            self.recorder.record(record);
        }
    }
}

impl Drop for PreloadingData {
    fn drop(&mut self) {
        let records = {
            let mut ledger = self.ledger.lock();
            // Nothing left here was confirmed by a commit.
            ledger.reset_accuracy();
            let records = ledger.build_records(None, self.sampler.as_ref());
            let page = ledger.triggering_page;
            ledger.reset(page);
            records
        };
        if !records.is_empty() {
            tracing::debug!(records = records.len(), "Flushing preloading telemetry on teardown");
        }
        self.emit(records);
    }
}

impl std::fmt::Debug for PreloadingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadingData")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

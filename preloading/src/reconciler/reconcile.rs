//! Merge-join reconciliation of candidates against running prerenders.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use url::Url;

use super::candidate::{Candidate, PrerenderHostId, SpeculationAction, StartedPrerender};

/// Starts and destroys prerender hosts.
pub trait PrerenderHostRegistry: Send + Sync {
    /// Start a prerender for `candidate`; `None` if the registry refuses.
    fn start_prerender(&self, candidate: &Candidate) -> Option<PrerenderHostId>;

    /// The trigger for `host_id` went away; tear the host down.
    fn on_trigger_destroyed(&self, host_id: PrerenderHostId);
}

/// Actions taken by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub started: Vec<Url>,
    pub cancelled: Vec<Url>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.cancelled.is_empty()
    }
}

/// Keeps the set of running prerenders in step with a document's candidates.
///
/// Started prerenders are kept sorted by URL so each update is a single
/// merge walk over both sorted lists.
pub struct CandidateReconciler {
    registry: Arc<dyn PrerenderHostRegistry>,
    started: Vec<StartedPrerender>,
}

impl CandidateReconciler {
    pub fn new(registry: Arc<dyn PrerenderHostRegistry>) -> Self {
        Self {
            registry,
            started: Vec::new(),
        }
    }

    /// Prerenders currently tracked, sorted by URL.
    pub fn started_prerenders(&self) -> &[StartedPrerender] {
        &self.started
    }

    /// Reconcile against the document's full candidate list.
    ///
    /// Non-prerender candidates are ignored. Among candidates sharing a URL
    /// the first one listed is the one started.
    pub fn update_candidates(&mut self, candidates: &[Candidate]) -> ReconcileOutcome {
        let mut wanted: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.action == SpeculationAction::Prerender)
            .collect();
        // Stable, so the first listed candidate leads each run of equal URLs.
        wanted.sort_by(|a, b| a.url.cmp(&b.url));

        let previous = std::mem::take(&mut self.started);
        let mut next = Vec::with_capacity(wanted.len());
        let mut outcome = ReconcileOutcome::default();

        let mut old = previous.into_iter().peekable();
        let mut new = wanted.into_iter().peekable();

        loop {
            let order = match (old.peek(), new.peek()) {
                (None, None) => break,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(started), Some(candidate)) => started.url.cmp(&candidate.url),
            };

            match order {
                Ordering::Less => {
                    if let Some(started) = old.next() {
                        self.destroy(started, &mut outcome);
                    }
                }
                Ordering::Greater => {
                    if let Some(candidate) = new.next() {
                        while new.next_if(|c| c.url == candidate.url).is_some() {}
                        next.push(self.start(candidate, &mut outcome));
                    }
                }
                Ordering::Equal => {
                    if let Some(started) = old.next() {
                        while new.next_if(|c| c.url == started.url).is_some() {}
                        next.push(started);
                    }
                }
            }
        }

        self.started = next;
        if !outcome.is_empty() {
            tracing::debug!(
                started = outcome.started.len(),
                cancelled = outcome.cancelled.len(),
                running = self.started.len(),
                "Reconciled prerender candidates"
            );
        }
        outcome
    }

    /// Cancel every tracked prerender, e.g. when the primary page changes.
    pub fn cancel_all(&mut self) -> Vec<Url> {
        let mut outcome = ReconcileOutcome::default();
        for started in std::mem::take(&mut self.started) {
            self.destroy(started, &mut outcome);
        }
        if !outcome.cancelled.is_empty() {
            tracing::debug!(cancelled = outcome.cancelled.len(), "Cancelled all prerenders");
        }
        outcome.cancelled
    }

    fn start(&self, candidate: &Candidate, outcome: &mut ReconcileOutcome) -> StartedPrerender {
        let host_id = self.registry.start_prerender(candidate);
        match host_id {
            Some(id) => {
                tracing::debug!(url = %candidate.url, host = %id, "Prerender started");
                outcome.started.push(candidate.url.clone());
            }
            None => tracing::debug!(url = %candidate.url, "Prerender start refused"),
        }
        StartedPrerender {
            url: candidate.url.clone(),
            referrer: candidate.referrer.clone(),
            host_id,
        }
    }

    fn destroy(&self, started: StartedPrerender, outcome: &mut ReconcileOutcome) {
        if let Some(id) = started.host_id {
            tracing::debug!(url = %started.url, host = %id, "Prerender cancelled");
            self.registry.on_trigger_destroyed(id);
            outcome.cancelled.push(started.url);
        }
    }
}

impl Drop for CandidateReconciler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl fmt::Debug for CandidateReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateReconciler")
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum RegistryEvent {
        Started(Url, PrerenderHostId),
        Destroyed(PrerenderHostId),
    }

    #[derive(Default)]
    struct RecordingRegistry {
        next_id: Mutex<u64>,
        events: Mutex<Vec<RegistryEvent>>,
        refused: HashSet<Url>,
    }

    impl RecordingRegistry {
        fn refusing(urls: &[Url]) -> Self {
            Self {
                refused: urls.iter().cloned().collect(),
                ..Self::default()
            }
        }

        fn events(&self) -> Vec<RegistryEvent> {
            self.events.lock().clone()
        }

        fn start_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, RegistryEvent::Started(..)))
                .count()
        }
    }

    impl PrerenderHostRegistry for RecordingRegistry {
        fn start_prerender(&self, candidate: &Candidate) -> Option<PrerenderHostId> {
            if self.refused.contains(&candidate.url) {
                return None;
            }
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            let id = PrerenderHostId(*next_id);
            self.events
                .lock()
                .push(RegistryEvent::Started(candidate.url.clone(), id));
            Some(id)
        }

        fn on_trigger_destroyed(&self, host_id: PrerenderHostId) {
            self.events.lock().push(RegistryEvent::Destroyed(host_id));
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com/{}", path)).unwrap()
    }

    fn urls(started: &[StartedPrerender]) -> Vec<Url> {
        started.iter().map(|s| s.url.clone()).collect()
    }

    #[test]
    fn test_replacing_candidates() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut reconciler = CandidateReconciler::new(registry.clone());

        let outcome = reconciler.update_candidates(&[
            Candidate::prerender(url("a")),
            Candidate::prerender(url("b")),
        ]);
        assert_eq!(outcome.started, vec![url("a"), url("b")]);
        assert!(outcome.cancelled.is_empty());

        let outcome = reconciler.update_candidates(&[
            Candidate::prerender(url("c")),
            Candidate::prerender(url("b")),
        ]);
        assert_eq!(outcome.started, vec![url("c")]);
        assert_eq!(outcome.cancelled, vec![url("a")]);
        assert_eq!(urls(reconciler.started_prerenders()), vec![url("b"), url("c")]);

        assert_eq!(
            registry.events(),
            vec![
                RegistryEvent::Started(url("a"), PrerenderHostId(1)),
                RegistryEvent::Started(url("b"), PrerenderHostId(2)),
                RegistryEvent::Destroyed(PrerenderHostId(1)),
                RegistryEvent::Started(url("c"), PrerenderHostId(3)),
            ]
        );
    }

    #[test]
    fn test_same_candidates_are_idempotent() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut reconciler = CandidateReconciler::new(registry.clone());
        let candidates = [
            Candidate::prerender(url("b")),
            Candidate::prerender(url("a")),
        ];

        reconciler.update_candidates(&candidates);
        let outcome = reconciler.update_candidates(&candidates);
        assert!(outcome.is_empty());
        assert_eq!(registry.start_count(), 2);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut reconciler = CandidateReconciler::new(registry.clone());
        let first = url("first");
        let second = url("second");

        reconciler.update_candidates(&[
            Candidate::prerender(url("a")).with_referrer(first.clone()),
            Candidate::prerender(url("a")).with_referrer(second),
        ]);

        assert_eq!(registry.start_count(), 1);
        assert_eq!(reconciler.started_prerenders().len(), 1);
        assert_eq!(reconciler.started_prerenders()[0].referrer, Some(first));
    }

    #[test]
    fn test_non_prerender_candidates_ignored() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut reconciler = CandidateReconciler::new(registry.clone());

        let outcome = reconciler.update_candidates(&[
            Candidate::new(url("a"), SpeculationAction::Prefetch),
            Candidate::new(url("b"), SpeculationAction::PrefetchWithSubresources),
        ]);
        assert!(outcome.is_empty());
        assert!(reconciler.started_prerenders().is_empty());
    }

    #[test]
    fn test_refused_start_not_retried() {
        let registry = Arc::new(RecordingRegistry::refusing(&[url("a")]));
        let mut reconciler = CandidateReconciler::new(registry.clone());

        let outcome = reconciler.update_candidates(&[Candidate::prerender(url("a"))]);
        assert!(outcome.started.is_empty());
        assert_eq!(reconciler.started_prerenders()[0].host_id, None);

        let outcome = reconciler.update_candidates(&[Candidate::prerender(url("a"))]);
        assert!(outcome.is_empty());

        // Dropping the candidate removes the entry without a destroy call.
        let outcome = reconciler.update_candidates(&[]);
        assert!(outcome.is_empty());
        assert!(reconciler.started_prerenders().is_empty());
        assert!(registry.events().is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let registry = Arc::new(RecordingRegistry::default());
        let mut reconciler = CandidateReconciler::new(registry.clone());
        reconciler.update_candidates(&[
            Candidate::prerender(url("a")),
            Candidate::prerender(url("b")),
        ]);

        let cancelled = reconciler.cancel_all();
        assert_eq!(cancelled, vec![url("a"), url("b")]);
        assert!(reconciler.started_prerenders().is_empty());
        assert!(reconciler.cancel_all().is_empty());
    }

    #[test]
    fn test_drop_cancels_running_prerenders() {
        let registry = Arc::new(RecordingRegistry::default());
        {
            let mut reconciler = CandidateReconciler::new(registry.clone());
            reconciler.update_candidates(&[Candidate::prerender(url("a"))]);
        }
        assert_eq!(
            registry.events().last(),
            Some(&RegistryEvent::Destroyed(PrerenderHostId(1)))
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn candidate_strategy() -> impl Strategy<Value = Candidate> {
            (0u8..6, 0u8..3).prop_map(|(path, action)| {
                let action = match action {
                    0 => SpeculationAction::Prefetch,
                    1 => SpeculationAction::PrefetchWithSubresources,
                    _ => SpeculationAction::Prerender,
                };
                Candidate::new(url(&format!("p{}", path)), action)
            })
        }

        proptest! {
            #[test]
            fn reconcile_is_idempotent(
                candidates in prop::collection::vec(candidate_strategy(), 0..12)
            ) {
                let registry = Arc::new(RecordingRegistry::default());
                let mut reconciler = CandidateReconciler::new(registry.clone());

                reconciler.update_candidates(&candidates);
                let starts = registry.start_count();
                let outcome = reconciler.update_candidates(&candidates);

                prop_assert!(outcome.is_empty());
                prop_assert_eq!(registry.start_count(), starts);
            }

            #[test]
            fn started_set_tracks_latest_batch(
                batches in prop::collection::vec(
                    prop::collection::vec(candidate_strategy(), 0..8),
                    1..5,
                )
            ) {
                let registry = Arc::new(RecordingRegistry::default());
                let mut reconciler = CandidateReconciler::new(registry.clone());

                for batch in &batches {
                    reconciler.update_candidates(batch);
                }

                let mut expected: Vec<Url> = batches
                    .last()
                    .into_iter()
                    .flatten()
                    .filter(|c| c.action == SpeculationAction::Prerender)
                    .map(|c| c.url.clone())
                    .collect();
                expected.sort();
                expected.dedup();
                prop_assert_eq!(urls(reconciler.started_prerenders()), expected);
            }
        }
    }
}

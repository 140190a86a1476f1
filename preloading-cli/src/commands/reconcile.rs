//! Replay candidate batches through the reconciler.
//!
//! The input is a JSON array of batches, each the full candidate list a
//! document offered at one point in time:
//!
//! ```json
//! [
//!   [{"url": "https://example.com/a", "action": "prerender"}],
//!   [{"url": "https://example.com/b", "action": "prerender"}]
//! ]
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use preloading::reconciler::{
    Candidate, CandidateReconciler, PrerenderHostId, PrerenderHostRegistry, ReconcileOutcome,
};
use preloading::settings::Settings;

use crate::error::{read_file, CliError};

/// Registry that accepts starts up to a fixed number of running hosts.
#[derive(Debug)]
struct SimulatedRegistry {
    max_prerenders: usize,
    next_id: AtomicU64,
    running: AtomicUsize,
}

impl SimulatedRegistry {
    fn new(max_prerenders: usize) -> Self {
        Self {
            max_prerenders,
            next_id: AtomicU64::new(1),
            running: AtomicUsize::new(0),
        }
    }
}

impl PrerenderHostRegistry for SimulatedRegistry {
    fn start_prerender(&self, candidate: &Candidate) -> Option<PrerenderHostId> {
        if self.running.load(Ordering::SeqCst) >= self.max_prerenders {
            tracing::info!(url = %candidate.url, limit = self.max_prerenders, "Prerender limit reached");
            return None;
        }
        self.running.fetch_add(1, Ordering::SeqCst);
        Some(PrerenderHostId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn on_trigger_destroyed(&self, _host_id: PrerenderHostId) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run the reconcile command.
pub fn run(input: &Path, settings: &Settings) -> Result<(), CliError> {
    let json = read_file(input)?;
    let batches: Vec<Vec<Candidate>> =
        serde_json::from_str(&json).map_err(|source| CliError::Json {
            path: input.to_path_buf(),
            source,
        })?;

    let (outcomes, teardown) = replay(&batches, settings.prefetch.max_prerenders);
    for (index, outcome) in outcomes.iter().enumerate() {
        println!("batch {}:", index + 1);
        print_outcome(outcome);
    }
    println!("teardown:");
    print_outcome(&ReconcileOutcome {
        started: Vec::new(),
        cancelled: teardown,
    });
    Ok(())
}

/// Apply each batch in turn, then cancel whatever is left running.
fn replay(
    batches: &[Vec<Candidate>],
    max_prerenders: usize,
) -> (Vec<ReconcileOutcome>, Vec<url::Url>) {
    let registry = Arc::new(SimulatedRegistry::new(max_prerenders));
    let mut reconciler = CandidateReconciler::new(registry);
    let outcomes = batches
        .iter()
        .map(|batch| reconciler.update_candidates(batch))
        .collect();
    let teardown = reconciler.cancel_all();
    (outcomes, teardown)
}

fn print_outcome(outcome: &ReconcileOutcome) {
    if outcome.is_empty() {
        println!("  (no changes)");
    }
    for url in &outcome.cancelled {
        println!("  - {}", url);
    }
    for url in &outcome.started {
        println!("  + {}", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preloading::reconciler::SpeculationAction;
    use url::Url;

    fn prerender(path: &str) -> Candidate {
        Candidate::prerender(Url::parse(&format!("https://example.com/{}", path)).unwrap())
    }

    #[test]
    fn test_replay_reports_starts_and_cancels() {
        let batches = vec![
            vec![prerender("a"), prerender("b")],
            vec![prerender("b"), prerender("c")],
            vec![prerender("b"), prerender("c")],
        ];

        let (outcomes, teardown) = replay(&batches, 10);
        assert_eq!(outcomes[0].started.len(), 2);
        assert_eq!(outcomes[1].started, vec![prerender("c").url]);
        assert_eq!(outcomes[1].cancelled, vec![prerender("a").url]);
        assert!(outcomes[2].is_empty());
        assert_eq!(teardown.len(), 2);
    }

    #[test]
    fn test_replay_respects_prerender_limit() {
        let batches = vec![vec![prerender("a"), prerender("b"), prerender("c")]];
        let (outcomes, teardown) = replay(&batches, 1);
        assert_eq!(outcomes[0].started, vec![prerender("a").url]);
        assert_eq!(teardown, vec![prerender("a").url]);
    }

    #[test]
    fn test_batches_parse_from_json() {
        let json = r#"[[
            {"url": "https://example.com/a", "action": "prerender"},
            {"url": "https://example.com/b", "action": "prefetch", "referrer": "https://example.com/"}
        ]]"#;
        let batches: Vec<Vec<Candidate>> = serde_json::from_str(json).unwrap();
        assert_eq!(batches[0][0].action, SpeculationAction::Prerender);
        assert_eq!(
            batches[0][1].referrer,
            Some(Url::parse("https://example.com/").unwrap())
        );
    }
}

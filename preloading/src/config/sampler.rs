//! Sampling decisions for telemetry emission.

use rand::Rng;

/// Decides whether a record with a given sampling likelihood is emitted.
///
/// Injected so tests can make sampling deterministic.
pub trait Sampler: Send + Sync {
    /// Return `true` to emit. `likelihood` is in 0.0..=1.0.
    fn sample(&self, likelihood: f64) -> bool;
}

/// Samples with the thread-local random generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn sample(&self, likelihood: f64) -> bool {
        if likelihood >= 1.0 {
            return true;
        }
        if likelihood <= 0.0 {
            return false;
        }
        rand::rng().random_bool(likelihood)
    }
}

/// Testing sampler that emits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSample;

impl Sampler for AlwaysSample {
    fn sample(&self, _likelihood: f64) -> bool {
        true
    }
}

/// Testing sampler that emits nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverSample;

impl Sampler for NeverSample {
    fn sample(&self, _likelihood: f64) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sampler_bounds() {
        let sampler = RandomSampler;
        for _ in 0..100 {
            assert!(sampler.sample(1.0));
            assert!(!sampler.sample(0.0));
        }
    }

    #[test]
    fn test_random_sampler_half() {
        let sampler = RandomSampler;
        let hits = (0..10_000).filter(|_| sampler.sample(0.5)).count();
        // Loose bound; a fair coin lands well inside this.
        assert!((4_000..6_000).contains(&hits), "hits = {}", hits);
    }
}

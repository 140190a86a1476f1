//! Holdback and sampling configuration.
//!
//! [`PreloadingConfig`] resolves, per (preloading type, predictor) pair,
//! whether an attempt is counterfactually held back and at what likelihood
//! its telemetry is emitted. [`Sampler`] turns that likelihood into a
//! per-record decision.

mod preloading_config;
mod sampler;

pub use preloading_config::{
    ConfigEntry, ParseReport, PreloadingConfig, DEFAULT_SAMPLING_LIKELIHOOD,
};
pub use sampler::{AlwaysSample, NeverSample, RandomSampler, Sampler};

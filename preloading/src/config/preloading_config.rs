//! Holdback and sampling table keyed by (preloading type, predictor).
//!
//! The table is parsed from a JSON array:
//!
//! ```json
//! [
//!   {"preloading_type": "Prerender", "preloading_predictor": "SpeculationRules",
//!    "holdback": true},
//!   {"preloading_type": "Prefetch", "preloading_predictor": "UrlPointerDownOnAnchor",
//!    "sampling_likelihood": 0.25}
//! ]
//! ```
//!
//! Malformed entries are skipped with a warning. A malformed document yields
//! an empty table, so every lookup falls back to the defaults.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::sampler::Sampler;
use crate::error::ConfigError;
use crate::types::{PreloadingPredictor, PreloadingType};

/// Default sampling likelihood for keys without an entry.
pub const DEFAULT_SAMPLING_LIKELIHOOD: f64 = 1.0;

/// Resolved configuration for one (type, predictor) key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigEntry {
    pub holdback: bool,
    pub sampling_likelihood: f64,
}

impl Default for ConfigEntry {
    fn default() -> Self {
        Self {
            holdback: false,
            sampling_likelihood: DEFAULT_SAMPLING_LIKELIHOOD,
        }
    }
}

/// Counts of accepted and skipped entries from one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    preloading_type: String,
    preloading_predictor: String,
    #[serde(default)]
    holdback: Option<bool>,
    #[serde(default)]
    sampling_likelihood: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConfigKey {
    preloading_type: String,
    predictor: String,
}

/// Per-(type, predictor) holdback and sampling lookup.
///
/// Constructed explicitly and shared through `Arc`; there is no global
/// instance.
#[derive(Debug, Clone, Default)]
pub struct PreloadingConfig {
    entries: HashMap<ConfigKey, ConfigEntry>,
}

impl PreloadingConfig {
    /// An empty table; every lookup returns the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration string.
    pub fn parse(json: &str) -> Self {
        Self::parse_with_report(json).0
    }

    /// Parse a JSON configuration string, reporting what was skipped.
    pub fn parse_with_report(json: &str) -> (Self, ParseReport) {
        let mut config = Self::new();
        let report = config.reload(json);
        (config, report)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// Only I/O failures are errors; content anomalies degrade to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&json))
    }

    /// Replace the table with the contents of `json`.
    pub fn reload(&mut self, json: &str) -> ParseReport {
        self.entries.clear();
        let mut report = ParseReport::default();

        let items: Vec<serde_json::Value> = match serde_json::from_str(json) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Preloading config is not a JSON array - using defaults");
                return report;
            }
        };

        for (index, item) in items.into_iter().enumerate() {
            match Self::parse_entry(item) {
                Some((key, entry)) => {
                    self.entries.insert(key, entry);
                    report.accepted += 1;
                }
                None => {
                    tracing::warn!(index, "Skipping malformed preloading config entry");
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(
            accepted = report.accepted,
            skipped = report.skipped,
            "Preloading config parsed"
        );
        report
    }

    fn parse_entry(item: serde_json::Value) -> Option<(ConfigKey, ConfigEntry)> {
        let raw: RawEntry = serde_json::from_value(item).ok()?;
        let sampling_likelihood = raw
            .sampling_likelihood
            .unwrap_or(DEFAULT_SAMPLING_LIKELIHOOD);
        if !(0.0..=1.0).contains(&sampling_likelihood) {
            return None;
        }

        let key = ConfigKey {
            preloading_type: raw.preloading_type,
            predictor: raw.preloading_predictor,
        };
        let entry = ConfigEntry {
            holdback: raw.holdback.unwrap_or(false),
            sampling_likelihood,
        };
        Some((key, entry))
    }

    /// Add or replace one entry.
    pub fn with_entry(
        mut self,
        preloading_type: PreloadingType,
        predictor: PreloadingPredictor,
        entry: ConfigEntry,
    ) -> Self {
        self.entries.insert(
            ConfigKey {
                preloading_type: preloading_type.as_str().to_string(),
                predictor: predictor.name().to_string(),
            },
            entry,
        );
        self
    }

    /// Look up an entry by its raw string key.
    pub fn entry(&self, preloading_type: &str, predictor: &str) -> ConfigEntry {
        let key = ConfigKey {
            preloading_type: preloading_type.to_string(),
            predictor: predictor.to_string(),
        };
        self.entries.get(&key).copied().unwrap_or_default()
    }

    /// Whether attempts of this key must be counterfactually held back.
    pub fn should_holdback(
        &self,
        preloading_type: PreloadingType,
        predictor: PreloadingPredictor,
    ) -> bool {
        self.entry(preloading_type.as_str(), predictor.name())
            .holdback
    }

    /// Likelihood that telemetry for this key is emitted.
    pub fn sampling_likelihood(
        &self,
        preloading_type: PreloadingType,
        predictor: PreloadingPredictor,
    ) -> f64 {
        self.entry(preloading_type.as_str(), predictor.name())
            .sampling_likelihood
    }

    /// Decide whether one record of this key is emitted.
    pub fn should_sample(
        &self,
        preloading_type: PreloadingType,
        predictor: PreloadingPredictor,
        sampler: &dyn Sampler,
    ) -> bool {
        sampler.sample(self.sampling_likelihood(preloading_type, predictor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlwaysSample, NeverSample};
    use crate::types::predictors;
    use std::io::Write;

    const PREDICTOR_X: PreloadingPredictor = PreloadingPredictor::new(42, "PredictorX");

    #[test]
    fn test_defaults_without_config() {
        let config = PreloadingConfig::new();
        for &ty in PreloadingType::all() {
            for &predictor in predictors::all() {
                assert!(!config.should_holdback(ty, predictor));
                assert_eq!(config.sampling_likelihood(ty, predictor), 1.0);
            }
        }
    }

    #[test]
    fn test_holdback_is_keyed_by_type() {
        let config = PreloadingConfig::parse(
            r#"[{"preloading_type": "Prerender", "preloading_predictor": "PredictorX",
                 "holdback": true}]"#,
        );
        assert!(config.should_holdback(PreloadingType::Prerender, PREDICTOR_X));
        assert!(!config.should_holdback(PreloadingType::Prefetch, PREDICTOR_X));
        assert_eq!(
            config.sampling_likelihood(PreloadingType::Prerender, PREDICTOR_X),
            1.0
        );
    }

    #[test]
    fn test_sampling_likelihood() {
        let config = PreloadingConfig::parse(
            r#"[{"preloading_type": "Prefetch",
                 "preloading_predictor": "UrlPointerDownOnAnchor",
                 "sampling_likelihood": 0.25}]"#,
        );
        assert_eq!(
            config.sampling_likelihood(
                PreloadingType::Prefetch,
                predictors::URL_POINTER_DOWN_ON_ANCHOR
            ),
            0.25
        );
        assert!(!config.should_holdback(
            PreloadingType::Prefetch,
            predictors::URL_POINTER_DOWN_ON_ANCHOR
        ));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let (config, report) = PreloadingConfig::parse_with_report(
            r#"[
                {"preloading_type": "Prerender", "preloading_predictor": "PredictorX",
                 "holdback": true},
                "not an object",
                {"preloading_type": "Prefetch"},
                {"preloading_type": 3, "preloading_predictor": "PredictorX"},
                {"preloading_type": "Prefetch", "preloading_predictor": "PredictorX",
                 "holdback": "yes"},
                {"preloading_type": "Prefetch", "preloading_predictor": "PredictorX",
                 "sampling_likelihood": 1.5}
            ]"#,
        );
        assert_eq!(report, ParseReport { accepted: 1, skipped: 5 });
        assert_eq!(config.len(), 1);
        assert!(config.should_holdback(PreloadingType::Prerender, PREDICTOR_X));
        assert!(!config.should_holdback(PreloadingType::Prefetch, PREDICTOR_X));
    }

    #[test]
    fn test_malformed_document_degrades_to_defaults() {
        for json in ["", "{}", "[", "null", r#"{"holdback": true}"#] {
            let config = PreloadingConfig::parse(json);
            assert!(config.is_empty(), "{:?} should parse to empty table", json);
        }
    }

    #[test]
    fn test_reload_replaces_table() {
        let mut config = PreloadingConfig::parse(
            r#"[{"preloading_type": "Prerender", "preloading_predictor": "PredictorX",
                 "holdback": true}]"#,
        );
        config.reload(
            r#"[{"preloading_type": "Prefetch", "preloading_predictor": "PredictorX",
                 "holdback": true}]"#,
        );
        assert!(!config.should_holdback(PreloadingType::Prerender, PREDICTOR_X));
        assert!(config.should_holdback(PreloadingType::Prefetch, PREDICTOR_X));
    }

    #[test]
    fn test_reload_is_idempotent() {
        let json = r#"[{"preloading_type": "Prerender", "preloading_predictor": "PredictorX",
                        "holdback": true, "sampling_likelihood": 0.5}]"#;
        let mut config = PreloadingConfig::parse(json);
        let first = config.entry("Prerender", "PredictorX");
        config.reload(json);
        assert_eq!(config.entry("Prerender", "PredictorX"), first);
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_should_sample_uses_sampler() {
        let config = PreloadingConfig::new();
        assert!(config.should_sample(PreloadingType::Prefetch, PREDICTOR_X, &AlwaysSample));
        assert!(!config.should_sample(PreloadingType::Prefetch, PREDICTOR_X, &NeverSample));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"preloading_type": "Prerender", "preloading_predictor": "PredictorX",
                  "holdback": true}}]"#
        )
        .unwrap();

        let config = PreloadingConfig::load(file.path()).unwrap();
        assert!(config.should_holdback(PreloadingType::Prerender, PREDICTOR_X));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = PreloadingConfig::load(Path::new("/nonexistent/preloading.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}

//! Preloading - speculative prefetch and prerender coordination
//!
//! This library decides whether a predicted next navigation should be
//! prefetched or prerendered, tracks the lifecycle of every attempt under a
//! strict state machine, reconciles changing candidate lists against running
//! prerenders, and produces accuracy telemetry used to tune each predictor.
//!
//! # Module Structure
//!
//! ```text
//! preloading/
//! ├── types.rs          # PreloadingType, PreloadingPredictor, UrlMatcher
//! ├── error.rs          # ContractViolation, ConfigError, LoggingError
//! ├── config/           # Holdback and sampling table (JSON)
//! ├── settings.rs       # Runtime settings (INI)
//! ├── attempt/          # Attempt state machine
//! ├── ledger/           # Attempt/prediction ledger and handles
//! ├── prefetch/         # Prefetch container, cookie copy, streaming loader
//! ├── reconciler/       # Candidate reconciliation for prerenders
//! ├── telemetry/        # Typed records and recorders
//! └── logging.rs        # tracing subscriber setup
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use preloading::config::PreloadingConfig;
//! use preloading::ledger::PreloadingData;
//! use preloading::telemetry::InMemoryRecorder;
//! use preloading::types::{predictors, PageId, PreloadingType, UrlMatcher};
//! use url::Url;
//!
//! let recorder = Arc::new(InMemoryRecorder::new());
//! let data = PreloadingData::new(
//!     PageId(1),
//!     Arc::new(PreloadingConfig::new()),
//!     recorder.clone(),
//! );
//!
//! let target = Url::parse("https://example.com/next").unwrap();
//! data.add_preloading_prediction(
//!     predictors::URL_POINTER_DOWN_ON_ANCHOR,
//!     100,
//!     UrlMatcher::same_url(target.clone()),
//! );
//! let attempt = data.add_preloading_attempt(
//!     predictors::URL_POINTER_DOWN_ON_ANCHOR,
//!     PreloadingType::Prefetch,
//!     UrlMatcher::same_url(target.clone()),
//! );
//! assert!(attempt.is_live());
//! ```

pub mod attempt;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod prefetch;
pub mod reconciler;
pub mod settings;
pub mod telemetry;
pub mod types;

/// Crate version, embedded in CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

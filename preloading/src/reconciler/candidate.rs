//! Speculation candidates and started prerenders.

use std::fmt;

use serde::Deserialize;
use url::Url;

/// What a speculation rule asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeculationAction {
    /// Fetch the main document only.
    Prefetch,
    /// Fetch the document and its subresources.
    PrefetchWithSubresources,
    /// Load and render the page in a hidden host.
    Prerender,
}

/// One speculation candidate offered by a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub url: Url,
    pub action: SpeculationAction,
    #[serde(default)]
    pub referrer: Option<Url>,
}

impl Candidate {
    pub fn new(url: Url, action: SpeculationAction) -> Self {
        Self {
            url,
            action,
            referrer: None,
        }
    }

    pub fn prerender(url: Url) -> Self {
        Self::new(url, SpeculationAction::Prerender)
    }

    pub fn with_referrer(mut self, referrer: Url) -> Self {
        self.referrer = Some(referrer);
        self
    }
}

/// Identifier of a running prerender host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrerenderHostId(pub u64);

impl fmt::Display for PrerenderHostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// A prerender the reconciler has asked the registry to start.
///
/// `host_id` is `None` when the registry refused the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedPrerender {
    pub url: Url,
    pub referrer: Option<Url>,
    pub host_id: Option<PrerenderHostId>,
}

//! Prefetch request parameters.

use serde::{Deserialize, Serialize};

/// How eagerly a speculation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeculationEagerness {
    /// As soon as the rule is seen.
    Immediate,
    /// On the slightest hint of intent.
    Eager,
    /// On hover.
    Moderate,
    /// On pointer down.
    Conservative,
}

/// Proxying and eagerness parameters for one prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PrefetchType {
    /// Fetch in an isolated network context; cookies are copied on use.
    pub is_isolated_network_context_required: bool,
    /// Route the request through the private prefetch proxy.
    pub use_prefetch_proxy: bool,
    pub eagerness: SpeculationEagerness,
}

impl PrefetchType {
    pub fn new(
        is_isolated_network_context_required: bool,
        use_prefetch_proxy: bool,
        eagerness: SpeculationEagerness,
    ) -> Self {
        Self {
            is_isolated_network_context_required,
            use_prefetch_proxy,
            eagerness,
        }
    }

    /// Same-site prefetch in the default network context.
    pub fn same_site(eagerness: SpeculationEagerness) -> Self {
        Self::new(false, false, eagerness)
    }

    /// Cross-site prefetch in an isolated context, optionally proxied.
    pub fn cross_site(use_prefetch_proxy: bool, eagerness: SpeculationEagerness) -> Self {
        Self::new(true, use_prefetch_proxy, eagerness)
    }
}

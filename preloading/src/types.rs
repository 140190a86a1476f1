//! Shared vocabulary types for preloading.
//!
//! Preloading types and predictors form the key space for the holdback
//! configuration and for every telemetry record. [`UrlMatcher`] is the
//! predicate a predictor supplies to decide whether a navigation counts as a
//! hit for its guess.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

/// The kind of speculative work being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PreloadingType {
    /// Opening a connection to the predicted origin.
    Preconnect,
    /// Fetching the predicted document without rendering it.
    Prefetch,
    /// Fully loading and rendering the predicted page in the background.
    Prerender,
    /// Fetching the document and its subresources without rendering.
    NoStatePrefetch,
}

impl PreloadingType {
    /// Name used as the `preloading_type` key in holdback configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreloadingType::Preconnect => "Preconnect",
            PreloadingType::Prefetch => "Prefetch",
            PreloadingType::Prerender => "Prerender",
            PreloadingType::NoStatePrefetch => "NoStatePrefetch",
        }
    }

    /// All preloading types, in declaration order.
    pub fn all() -> &'static [PreloadingType] {
        &[
            PreloadingType::Preconnect,
            PreloadingType::Prefetch,
            PreloadingType::Prerender,
            PreloadingType::NoStatePrefetch,
        ]
    }
}

impl fmt::Display for PreloadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PreloadingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreloadingType::all()
            .iter()
            .copied()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preloading type '{}'", s))
    }
}

/// Identity of a predictor that produced a prediction or triggered an attempt.
///
/// The numeric `code` is the stable value used in telemetry; `name` is the
/// key used by the holdback configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PreloadingPredictor {
    code: i64,
    name: &'static str,
}

impl PreloadingPredictor {
    /// Create a predictor identity.
    pub const fn new(code: i64, name: &'static str) -> Self {
        Self { code, name }
    }

    /// Stable telemetry code.
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Configuration key.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for PreloadingPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Well-known predictors.
///
/// Codes below 100 are reserved for predictors built into the navigation
/// layer; embedders start at 100.
pub mod predictors {
    use super::PreloadingPredictor;

    pub const URL_POINTER_DOWN_ON_ANCHOR: PreloadingPredictor =
        PreloadingPredictor::new(1, "UrlPointerDownOnAnchor");
    pub const URL_POINTER_HOVER_ON_ANCHOR: PreloadingPredictor =
        PreloadingPredictor::new(2, "UrlPointerHoverOnAnchor");
    pub const LINK_REL: PreloadingPredictor = PreloadingPredictor::new(3, "LinkRel");
    pub const SPECULATION_RULES: PreloadingPredictor =
        PreloadingPredictor::new(4, "SpeculationRules");
    pub const BACK_BUTTON_HOVER: PreloadingPredictor =
        PreloadingPredictor::new(5, "BackButtonHover");
    pub const VIEWPORT_HEURISTIC: PreloadingPredictor =
        PreloadingPredictor::new(7, "ViewportHeuristic");
    pub const OMNIBOX_DIRECT_URL_INPUT: PreloadingPredictor =
        PreloadingPredictor::new(100, "OmniboxDirectURLInput");
    pub const DEFAULT_SEARCH_ENGINE: PreloadingPredictor =
        PreloadingPredictor::new(101, "DefaultSearchEngine");

    /// All well-known predictors.
    pub fn all() -> &'static [PreloadingPredictor] {
        &[
            URL_POINTER_DOWN_ON_ANCHOR,
            URL_POINTER_HOVER_ON_ANCHOR,
            LINK_REL,
            SPECULATION_RULES,
            BACK_BUTTON_HOVER,
            VIEWPORT_HEURISTIC,
            OMNIBOX_DIRECT_URL_INPUT,
            DEFAULT_SEARCH_ENGINE,
        ]
    }

    /// Look up a well-known predictor by its configuration name.
    pub fn by_name(name: &str) -> Option<PreloadingPredictor> {
        all().iter().copied().find(|p| p.name() == name)
    }
}

/// Log identity of a page, used to anchor telemetry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// A navigation that committed in the primary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedNavigation {
    pub url: Url,
    pub page_id: PageId,
}

impl CommittedNavigation {
    pub fn new(url: Url, page_id: PageId) -> Self {
        Self { url, page_id }
    }
}

type MatchFn = dyn Fn(&Url) -> bool + Send + Sync;

/// Predicate deciding whether a navigated URL counts as a match.
///
/// An empty matcher never matches.
#[derive(Clone, Default)]
pub struct UrlMatcher {
    predicate: Option<Arc<MatchFn>>,
}

impl UrlMatcher {
    /// Matches exactly `url`.
    pub fn same_url(url: Url) -> Self {
        Self::from_fn(move |candidate| *candidate == url)
    }

    /// Matches whatever `predicate` accepts.
    pub fn from_fn(predicate: impl Fn(&Url) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// A matcher that never matches.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }

    pub fn matches(&self, url: &Url) -> bool {
        self.predicate.as_ref().is_some_and(|p| p(url))
    }
}

impl fmt::Debug for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlMatcher")
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_preloading_type_from_str_is_case_insensitive() {
        assert_eq!(
            "prerender".parse::<PreloadingType>().unwrap(),
            PreloadingType::Prerender
        );
        assert_eq!(
            "Prefetch".parse::<PreloadingType>().unwrap(),
            PreloadingType::Prefetch
        );
        assert!("prefetcher".parse::<PreloadingType>().is_err());
    }

    #[test]
    fn test_predictor_lookup_by_name() {
        assert_eq!(
            predictors::by_name("SpeculationRules"),
            Some(predictors::SPECULATION_RULES)
        );
        assert_eq!(predictors::by_name("Unknown"), None);
    }

    #[test]
    fn test_same_url_matcher() {
        let matcher = UrlMatcher::same_url(url("https://example.com/a"));
        assert!(matcher.matches(&url("https://example.com/a")));
        assert!(!matcher.matches(&url("https://example.com/b")));
    }

    #[test]
    fn test_empty_matcher_never_matches() {
        let matcher = UrlMatcher::none();
        assert!(matcher.is_empty());
        assert!(!matcher.matches(&url("https://example.com/")));
    }

    #[test]
    fn test_custom_matcher() {
        let matcher = UrlMatcher::from_fn(|u| u.path().starts_with("/search"));
        assert!(matcher.matches(&url("https://example.com/search?q=rust")));
        assert!(!matcher.matches(&url("https://example.com/")));
    }
}

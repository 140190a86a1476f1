//! A predictor's guess about the next navigation.

use url::Url;

use crate::types::{PreloadingPredictor, UrlMatcher};

/// A guess that the user will navigate somewhere `url_matcher` accepts.
///
/// Accuracy is decided lazily once the navigation URL is known.
#[derive(Debug)]
pub struct PreloadingPrediction {
    predictor: PreloadingPredictor,
    confidence: u8,
    url_matcher: UrlMatcher,
    is_accurate: bool,
}

impl PreloadingPrediction {
    pub(crate) fn new(predictor: PreloadingPredictor, confidence: u8, url_matcher: UrlMatcher) -> Self {
        Self {
            predictor,
            confidence,
            url_matcher,
            is_accurate: false,
        }
    }

    pub fn predictor(&self) -> PreloadingPredictor {
        self.predictor
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn is_accurate(&self) -> bool {
        self.is_accurate
    }

    pub(crate) fn evaluate(&mut self, url: &Url) {
        self.is_accurate = self.url_matcher.matches(url);
    }

    pub(crate) fn reset_accuracy(&mut self) {
        self.is_accurate = false;
    }
}

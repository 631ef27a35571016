//! Keyword matcher.
//!
//! A priority scan over the overlay finder's ranked candidates: the first
//! overlay whose visible text carries at least two lexicon hits wins.
//! Confidence grows with the hit count but is capped well below the
//! database and accessibility tiers; text evidence alone is never allowed
//! to outrank them.

use crate::overlay::find_overlays;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence, support};

/// Minimum lexicon hits (distinct or repeated) for a candidate.
const MIN_HITS: usize = 2;

pub struct KeywordMatcher;

impl KeywordMatcher {
    /// Monotonically increasing, capped confidence for a hit count.
    pub fn confidence_for(hits: usize) -> f32 {
        (confidence::KEYWORD_BASE + confidence::KEYWORD_STEP * hits as f32)
            .min(confidence::KEYWORD_CAP)
    }
}

impl Classifier for KeywordMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Keyword
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        // Overlays arrive best-stacked first, so the first qualifying one
        // is the answer; no full-corpus best-match pass needed.
        for overlay in find_overlays(ctx.snapshot) {
            let hits = ctx
                .lexicon
                .hits(&support::visible_text(ctx.snapshot, overlay));
            if hits.len() < MIN_HITS {
                continue;
            }
            let score = Self::confidence_for(hits.len());
            return Some(
                Detection::new(ClassifierKind::Keyword, overlay, score).with_keywords(hits),
            );
        }
        None
    }
}

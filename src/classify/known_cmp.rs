//! Known consent-platform matcher.
//!
//! Walks the curated platform list in database order and returns the first
//! entry whose banner selector hits a visible element. A hit on a
//! maintained selector database is treated as ground truth, so confidence
//! is fixed at the top of the ladder and the platform's button selectors
//! ride along for the actuator.

use crate::dom::selector::SelectorList;
use crate::visibility::is_visible;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence};

pub struct KnownCmpMatcher;

impl Classifier for KnownCmpMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::KnownCmp
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        for cmp in &ctx.patterns.known_cmps {
            for raw in &cmp.selectors.banner {
                let Some(list) = SelectorList::parse_lenient(raw) else {
                    continue;
                };
                let Some(banner) = ctx
                    .snapshot
                    .select(&list)
                    .into_iter()
                    .find(|&id| is_visible(ctx.snapshot, id))
                else {
                    continue;
                };
                let mut detection =
                    Detection::new(ClassifierKind::KnownCmp, banner, confidence::KNOWN_CMP);
                detection.cmp_name = Some(cmp.name.clone());
                detection.accept_selectors = cmp.selectors.accept_button.clone();
                detection.reject_selectors = cmp.selectors.reject_button.clone();
                return Some(detection);
            }
        }
        None
    }
}

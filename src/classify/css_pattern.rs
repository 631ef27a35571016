//! Generic CSS-pattern matcher.
//!
//! Last resort before pure heuristic scoring: configured catch-all
//! selectors ("anything with cookie in its class", vendor-agnostic banner
//! ids) tried in order, accepting the first visible hit that also has the
//! shape of a banner. Weakest fixed confidence in the cascade.

use crate::dom::selector::SelectorList;
use crate::visibility::is_visible;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence, support};

pub struct CssPatternMatcher;

impl Classifier for CssPatternMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::CssPattern
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        for raw in &ctx.patterns.css_patterns.banner {
            let Some(list) = SelectorList::parse_lenient(raw) else {
                continue;
            };
            let banner = ctx.snapshot.select(&list).into_iter().find(|&id| {
                is_visible(ctx.snapshot, id) && support::looks_like_banner(ctx.snapshot, id)
            });
            if let Some(banner) = banner {
                return Some(Detection::new(
                    ClassifierKind::CssPattern,
                    banner,
                    confidence::CSS_PATTERN,
                ));
            }
        }
        None
    }
}

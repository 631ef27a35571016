//! Backdrop matcher.
//!
//! Many consent dialogs render as a modal atop a full-viewport dimming
//! layer. The dimmer itself is not the banner; it is a structural arrow
//! pointing into its subtree: find the first visible descendant that
//! carries consent wording and an actionable control.

use crate::dom::{DomSnapshot, NodeId, Position};
use crate::visibility::is_visible;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence, support};

/// A dimming layer must span at least this fraction of both viewport axes.
const MIN_COVERAGE: f64 = 0.8;

fn is_backdrop(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let node = snapshot.node(id);
    matches!(node.style.position, Position::Fixed | Position::Absolute)
        && node.rect.width_fraction(snapshot.viewport()) >= MIN_COVERAGE
        && node.rect.height_fraction(snapshot.viewport()) >= MIN_COVERAGE
        && node.style.is_translucent()
        && is_visible(snapshot, id)
}

pub struct BackdropMatcher;

impl Classifier for BackdropMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Backdrop
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        for candidate in ctx.snapshot.document_order() {
            if !is_backdrop(ctx.snapshot, candidate) {
                continue;
            }
            // Strict descendants only: the dimmer is the pointer, never
            // the payload.
            let banner = ctx.snapshot.subtree(candidate).skip(1).find_map(|id| {
                if !is_visible(ctx.snapshot, id) {
                    return None;
                }
                support::consent_content(ctx, id).map(|hits| (id, hits))
            });
            if let Some((banner, hits)) = banner {
                return Some(
                    Detection::new(ClassifierKind::Backdrop, banner, confidence::BACKDROP)
                        .with_keywords(hits),
                );
            }
        }
        None
    }
}

//! Accessibility-role matcher.
//!
//! Consent dialogs built on ARIA roles announce themselves: a visible
//! `dialog`/`alertdialog` or landmark region whose accessible text carries
//! consent wording and which offers at least one actionable control is a
//! strong, though not database-grade, signal.

use crate::visibility::is_visible;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence, support};

/// Roles a consent surface plausibly announces itself under.
const CONSENT_ROLES: &[&str] = &["dialog", "alertdialog", "region", "banner", "complementary"];

pub struct AriaMatcher;

impl Classifier for AriaMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Aria
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        for id in ctx.snapshot.document_order() {
            let node = ctx.snapshot.node(id);
            let Some(role) = node.attrs.role.as_deref() else {
                continue;
            };
            if !CONSENT_ROLES.contains(&role) || !is_visible(ctx.snapshot, id) {
                continue;
            }
            let text = support::accessible_text(ctx.snapshot, id);
            let hits = ctx.lexicon.hits(&text);
            if hits.is_empty() {
                continue;
            }
            if support::actionable_controls(ctx.snapshot, id).is_empty() {
                continue;
            }
            return Some(
                Detection::new(ClassifierKind::Aria, id, confidence::ARIA).with_keywords(hits),
            );
        }
        None
    }
}

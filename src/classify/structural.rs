//! Generic structural scorer.
//!
//! The open-ended fallback for banners no other heuristic recognizes:
//! every overlay candidate that has the shape and wording of a banner gets
//! a weighted score built from keyword density, control count, recognized
//! button wording, size, positioning, and preference checkboxes. Readable
//! same-origin iframes compete as candidates of their own. Candidates
//! below the admission floor are discarded.

use crate::dom::Position;
use crate::overlay::find_overlays;

use super::{
    Classifier, ClassifierKind, Detection, DetectionContext, confidence, frames, support,
};

/// Keyword density contribution, capped.
const KEYWORD_WEIGHT: f32 = 0.05;
const KEYWORD_MAX: f32 = 0.15;
/// Control-count contributions; a visible accept/reject pair is the
/// typical banner signature and earns the larger bonus.
const SINGLE_CONTROL_BONUS: f32 = 0.05;
const CONTROL_PAIR_BONUS: f32 = 0.15;
/// Recognized accept/reject wording per control, capped.
const BUTTON_TEXT_WEIGHT: f32 = 0.05;
const BUTTON_TEXT_MAX: f32 = 0.10;
/// Comfortable-size and pinned-position bonuses.
const SIZE_BONUS: f32 = 0.05;
const SIZE_BONUS_WIDTH: f64 = 300.0;
const SIZE_BONUS_HEIGHT: f64 = 80.0;
const PINNED_BONUS: f32 = 0.10;
const CHECKBOX_BONUS: f32 = 0.05;

pub struct StructuralScorer;

impl Classifier for StructuralScorer {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Generic
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        let mut best: Option<Detection> = None;

        for overlay in find_overlays(ctx.snapshot) {
            if !support::looks_like_banner(ctx.snapshot, overlay) {
                continue;
            }
            let Some(hits) = support::consent_content(ctx, overlay) else {
                continue;
            };

            let node = ctx.snapshot.node(overlay);
            let controls = support::actionable_controls(ctx.snapshot, overlay);

            let mut score = confidence::GENERIC_BASE;
            score += (hits.len() as f32 * KEYWORD_WEIGHT).min(KEYWORD_MAX);
            score += if controls.len() >= 2 {
                CONTROL_PAIR_BONUS
            } else {
                SINGLE_CONTROL_BONUS
            };

            let labeled = support::controls_matching_fragments(
                ctx.snapshot,
                &controls,
                ctx.patterns
                    .button_patterns
                    .accept_fragments()
                    .chain(ctx.patterns.button_patterns.reject_fragments()),
            );
            score += (labeled as f32 * BUTTON_TEXT_WEIGHT).min(BUTTON_TEXT_MAX);

            if node.rect.width >= SIZE_BONUS_WIDTH && node.rect.height >= SIZE_BONUS_HEIGHT {
                score += SIZE_BONUS;
            }
            if matches!(node.style.position, Position::Fixed | Position::Sticky) {
                score += PINNED_BONUS;
            }
            if support::has_preference_checkbox(ctx.snapshot, overlay) {
                score += CHECKBOX_BONUS;
            }
            let score = score.min(confidence::GENERIC_CAP);

            let candidate =
                Detection::new(ClassifierKind::Generic, overlay, score).with_keywords(hits);
            if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
        }

        // A readable iframe banner competes at its own fixed confidence.
        if let Some((banner, hits)) = frames::first_frame_banner(ctx) {
            let mut candidate = Detection::new(ClassifierKind::Generic, banner, confidence::IFRAME)
                .with_keywords(hits);
            candidate.in_iframe = true;
            if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
        }

        best.filter(|d| d.confidence >= confidence::GENERIC_FLOOR)
    }
}

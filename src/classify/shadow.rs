//! Shadow-DOM matcher.
//!
//! Several consent vendors render entirely inside attached shadow roots,
//! invisible to light-tree selector queries. This matcher walks the light
//! tree for shadow hosts and searches each shadow tree, including nested
//! shadow roots, for a visible element with enough consent wording and an
//! actionable control. The walk is bounded by the snapshot tree itself, so
//! it terminates on any input.

use crate::dom::{DomSnapshot, NodeId};
use crate::visibility::is_visible;

use super::{Classifier, ClassifierKind, Detection, DetectionContext, confidence, support};

/// Shadow content needs stronger wording than the light-tree tests: two
/// lexicon hits rather than one.
const MIN_HITS: usize = 2;

pub struct ShadowDomMatcher;

impl Classifier for ShadowDomMatcher {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::ShadowDom
    }

    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
        for host in shadow_hosts(ctx.snapshot) {
            if let Some(detection) = search_shadow_tree(ctx, host) {
                return Some(detection);
            }
        }
        None
    }
}

fn shadow_hosts(snapshot: &DomSnapshot) -> impl Iterator<Item = NodeId> + '_ {
    snapshot
        .document_order()
        .filter(|&id| !snapshot.node(id).shadow_children.is_empty())
}

/// Pre-order search of one host's shadow tree, descending through light
/// children and any nested shadow roots alike.
fn search_shadow_tree(ctx: &DetectionContext<'_>, host: NodeId) -> Option<Detection> {
    let mut stack: Vec<NodeId> = ctx
        .snapshot
        .node(host)
        .shadow_children
        .iter()
        .rev()
        .copied()
        .collect();

    while let Some(id) = stack.pop() {
        let node = ctx.snapshot.node(id);
        for &child in node.shadow_children.iter().rev() {
            stack.push(child);
        }
        for &child in node.children.iter().rev() {
            stack.push(child);
        }

        if !is_visible(ctx.snapshot, id) {
            continue;
        }
        let hits = ctx.lexicon.hits(&support::visible_text(ctx.snapshot, id));
        if hits.len() < MIN_HITS {
            continue;
        }
        if support::actionable_controls(ctx.snapshot, id).is_empty() {
            continue;
        }
        return Some(
            Detection::new(ClassifierKind::ShadowDom, id, confidence::SHADOW_DOM)
                .with_keywords(hits),
        );
    }
    None
}

//! Structural checks shared across classifiers.
//!
//! Everything here treats the snapshot as adversarial: missing text,
//! attribute-free controls, and invisible subtrees all degrade to empty
//! results rather than faults.

use crate::dom::{DomSnapshot, NodeId};
use crate::overlay::within_banner_envelope;
use crate::visibility::is_visible;

use super::DetectionContext;

/// Visible light-tree text under `id`, joined with single spaces.
///
/// Invisible subtrees contribute nothing: text inside a `display:none`
/// preferences panel must not feed keyword counts.
pub fn visible_text(snapshot: &DomSnapshot, id: NodeId) -> String {
    let mut out = String::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !is_visible(snapshot, current) {
            continue;
        }
        let node = snapshot.node(current);
        let piece = node.text.trim();
        if !piece.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
        }
        for &child in node.children.iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Visible text plus the element's own `aria-label`, for accessibility
/// matching where the label carries the consent wording.
pub fn accessible_text(snapshot: &DomSnapshot, id: NodeId) -> String {
    let mut text = visible_text(snapshot, id);
    if let Some(label) = snapshot.node(id).attrs.aria_label.as_deref() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(label);
    }
    text
}

/// Whether a node is an actionable control: button, link, `role=button`,
/// or a submit/button input.
pub fn is_actionable(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let node = snapshot.node(id);
    match node.tag.as_str() {
        "button" | "a" => true,
        "input" => matches!(
            node.attrs.input_type.as_deref(),
            Some("submit") | Some("button")
        ),
        _ => node.attrs.role.as_deref() == Some("button"),
    }
}

/// Visible actionable controls within `root`'s light subtree, document
/// order.
pub fn actionable_controls(snapshot: &DomSnapshot, root: NodeId) -> Vec<NodeId> {
    snapshot
        .subtree(root)
        .filter(|&id| is_actionable(snapshot, id) && is_visible(snapshot, id))
        .collect()
}

/// The consent-content test: at least one lexicon hit in visible text AND
/// at least one actionable control. Returns the matched keywords on
/// success so callers can attach them to the detection.
pub fn consent_content(ctx: &DetectionContext<'_>, id: NodeId) -> Option<Vec<String>> {
    let hits = ctx.lexicon.hits(&visible_text(ctx.snapshot, id));
    if hits.is_empty() {
        return None;
    }
    if actionable_controls(ctx.snapshot, id).is_empty() {
        return None;
    }
    Some(hits)
}

/// The banner shape test: plausible size envelope plus at least one
/// actionable control.
pub fn looks_like_banner(snapshot: &DomSnapshot, id: NodeId) -> bool {
    within_banner_envelope(snapshot, id) && !actionable_controls(snapshot, id).is_empty()
}

/// Whether the subtree carries preference checkboxes or switches, the
/// usual furniture of per-category consent choices.
pub fn has_preference_checkbox(snapshot: &DomSnapshot, root: NodeId) -> bool {
    snapshot.subtree(root).any(|id| {
        let node = snapshot.node(id);
        (node.tag == "input" && node.attrs.input_type.as_deref() == Some("checkbox"))
            || matches!(node.attrs.role.as_deref(), Some("checkbox" | "switch"))
    })
}

/// How many of `controls` carry one of the button-text `fragments`
/// (case-insensitive substring over accessible text).
pub fn controls_matching_fragments<'a>(
    snapshot: &DomSnapshot,
    controls: &[NodeId],
    fragments: impl Iterator<Item = &'a str> + Clone,
) -> usize {
    controls
        .iter()
        .filter(|&&control| {
            let text = accessible_text(snapshot, control).to_lowercase();
            fragments.clone().any(|fragment| text.contains(fragment))
        })
        .count()
}

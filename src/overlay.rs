//! Overlay finder.
//!
//! Consent banners are deliberately rendered above page content, so stacking
//! order is the strongest cheap discriminator available before any text
//! analysis. This module scans one snapshot for container elements
//! positioned as overlays within a plausible banner size envelope and ranks
//! them by stacking priority; the keyword and structural classifiers then
//! work down that ranked list.

use crate::dom::{DomSnapshot, NodeId, Position};
use crate::visibility::is_visible;

/// Minimum rendered width for a banner candidate, in CSS pixels.
pub const MIN_BANNER_WIDTH: f64 = 240.0;
/// Minimum rendered height for a banner candidate, in CSS pixels.
pub const MIN_BANNER_HEIGHT: f64 = 48.0;
/// Candidates taller than this fraction of the viewport are excluded here;
/// full-viewport dimmed layers are the backdrop matcher's territory.
pub const MAX_BANNER_HEIGHT_FRACTION: f64 = 0.85;

/// Absolute-positioned elements need at least this stacking order.
const MIN_Z_ABSOLUTE: i32 = 10;
/// Above this stacking order, positioning mode no longer matters.
const MIN_Z_ANY_POSITION: i32 = 1000;

/// Container-like tags worth considering as banner roots.
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "aside", "footer", "header", "form", "dialog",
];

/// Whether `id` sits within the plausible banner size envelope.
pub fn within_banner_envelope(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let node = snapshot.node(id);
    node.rect.width >= MIN_BANNER_WIDTH
        && node.rect.height >= MIN_BANNER_HEIGHT
        && node.rect.height_fraction(snapshot.viewport()) <= MAX_BANNER_HEIGHT_FRACTION
}

fn is_container(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let node = snapshot.node(id);
    CONTAINER_TAGS.contains(&node.tag.as_str())
        || matches!(node.attrs.role.as_deref(), Some("dialog" | "alertdialog"))
}

fn is_overlay_positioned(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let style = &snapshot.node(id).style;
    match style.position {
        Position::Fixed | Position::Sticky => true,
        Position::Absolute => style.stacking_order() >= MIN_Z_ABSOLUTE,
        _ => style.stacking_order() >= MIN_Z_ANY_POSITION,
    }
}

/// Position-type priority for stacking ties: fixed > sticky > absolute.
fn position_rank(position: Position) -> u8 {
    match position {
        Position::Fixed => 3,
        Position::Sticky => 2,
        Position::Absolute => 1,
        _ => 0,
    }
}

/// All overlay candidates in one snapshot, best-stacked first.
///
/// The result reflects a single DOM walk; callers scan it front to back
/// and stop at the first acceptable candidate.
pub fn find_overlays(snapshot: &DomSnapshot) -> Vec<NodeId> {
    let mut overlays: Vec<NodeId> = snapshot
        .document_order()
        .filter(|&id| {
            is_container(snapshot, id)
                && is_visible(snapshot, id)
                && is_overlay_positioned(snapshot, id)
                && within_banner_envelope(snapshot, id)
        })
        .collect();

    overlays.sort_by_key(|&id| {
        let style = &snapshot.node(id).style;
        // Descending z-order, ties by position priority; stable sort keeps
        // document order for full ties.
        (
            std::cmp::Reverse(style.stacking_order()),
            std::cmp::Reverse(position_rank(style.position)),
        )
    });
    overlays
}

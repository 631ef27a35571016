//! Visibility oracle.
//!
//! Decides whether an element is actually rendered. Every classifier and
//! the actuator route through this check so that hidden machinery
//! (`display:none` template stock, zero-opacity layers, collapsed boxes)
//! can never become a detection result or a click target.
//!
//! The check is a pure read and is re-evaluated on every call: layout can
//! change between calls even within one detection cycle, so there is
//! nothing safe to cache here.

use crate::dom::{DomSnapshot, NodeId};

/// Whether `id` is rendered and could be interacted with.
///
/// False when computed display is `none`, visibility is `hidden`, opacity
/// is exactly zero, or the rendered box has zero width or height. Computed
/// values arrive cascade-resolved from the host, and unrendered ancestors
/// collapse their subtree's boxes, so a per-node test is sufficient.
pub fn is_visible(snapshot: &DomSnapshot, id: NodeId) -> bool {
    let Some(node) = snapshot.get(id) else {
        return false;
    };
    node.style.display != "none"
        && node.style.visibility != "hidden"
        && node.style.opacity > 0.0
        && node.rect.has_area()
}

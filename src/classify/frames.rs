//! Same-origin iframe sub-check.
//!
//! Some vendors render the whole consent dialog inside an iframe. Frames
//! the host could read (same-origin) are walked for consent content;
//! cross-origin frames are sealed by the platform sandbox and every access
//! attempt falls through silently to the next frame. That opacity is a
//! permanent, documented limitation, not a defect.

use crate::dom::{DomSnapshot, FrameContents, NodeId};
use crate::visibility::is_visible;

use super::{DetectionContext, support};

/// First consent-bearing element inside any readable iframe, with its
/// matched keywords. Document order over frames, then over frame content.
pub fn first_frame_banner(ctx: &DetectionContext<'_>) -> Option<(NodeId, Vec<String>)> {
    for frame_element in frames_in(ctx.snapshot) {
        if !is_visible(ctx.snapshot, frame_element) {
            continue;
        }
        let document = match &ctx.snapshot.node(frame_element).frame {
            Some(FrameContents::SameOrigin { document }) => *document,
            Some(FrameContents::CrossOrigin) => {
                tracing::trace!(
                    frame = %ctx.snapshot.describe(frame_element),
                    "skipping cross-origin frame"
                );
                continue;
            }
            None => continue,
        };
        let hit = ctx.snapshot.subtree(document).find_map(|id| {
            if !is_visible(ctx.snapshot, id) {
                return None;
            }
            support::consent_content(ctx, id).map(|hits| (id, hits))
        });
        if hit.is_some() {
            return hit;
        }
    }
    None
}

fn frames_in(snapshot: &DomSnapshot) -> impl Iterator<Item = NodeId> + '_ {
    snapshot
        .document_order()
        .filter(|&id| snapshot.node(id).tag == "iframe")
}

//! Arena-backed DOM snapshot model.
//!
//! The host platform (extension shell, CDP driver, test harness) captures
//! the live page as a JSON tree (tag, attributes, computed style, bounding
//! box, direct text, shadow content, frame content) at a single instant.
//! This module flattens that tree into an arena the classifiers can walk
//! cheaply and repeatedly.
//!
//! The snapshot never owns live DOM nodes; a [`NodeId`] is only meaningful
//! against the snapshot that produced it and becomes garbage on navigation.
//! Every accessor is total: absent attributes and empty text yield defaults
//! so that adversarial page structure cannot fault a classifier.

pub mod geometry;
pub mod selector;
pub mod style;

pub use geometry::{BoundingBox, Viewport};
pub use style::{ComputedStyle, Position};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use selector::SelectorList;

/// Index of a node within one snapshot's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

/// Attributes the detection heuristics consume.
///
/// Mirrors what the host extracts per element; everything is optional
/// because pages omit, misspell, or fabricate attributes at will.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeAttributes {
    pub id: Option<String>,
    pub class: Option<String>,
    pub role: Option<String>,
    pub aria_label: Option<String>,
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub href: Option<String>,
    pub title: Option<String>,
}

impl NodeAttributes {
    /// Generic lookup by attribute name, as used by selector matching.
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "id" => &self.id,
            "class" => &self.class,
            "role" => &self.role,
            "aria-label" => &self.aria_label,
            "type" => &self.input_type,
            "name" => &self.name,
            "href" => &self.href,
            "title" => &self.title,
            _ => &None,
        };
        value.as_deref()
    }

    /// Whitespace-split class tokens; empty when the attribute is absent.
    pub fn class_list(&self) -> impl Iterator<Item = &str> {
        self.class.as_deref().unwrap_or("").split_whitespace()
    }
}

/// Content of an `<iframe>` element.
///
/// Cross-origin frames are visible as elements but sealed by the host
/// sandbox: their inner document is not captured and any inspection attempt
/// must fall through silently. This is a platform constraint, not a gap.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameContents {
    SameOrigin { document: NodeId },
    CrossOrigin,
}

/// One element in the snapshot arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Lowercased tag name.
    pub tag: String,
    pub attrs: NodeAttributes,
    pub style: ComputedStyle,
    pub rect: BoundingBox,
    /// Direct text of this element (not descendants).
    pub text: String,
    pub parent: Option<NodeId>,
    /// Light-tree children, in document order.
    pub children: Vec<NodeId>,
    /// Roots of an attached shadow tree, if any.
    pub shadow_children: Vec<NodeId>,
    pub frame: Option<FrameContents>,
}

/// Wire format for one captured element.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSpec {
    pub tag: String,
    pub attrs: NodeAttributes,
    pub style: ComputedStyle,
    pub rect: BoundingBox,
    pub text: String,
    pub children: Vec<NodeSpec>,
    /// Children of an attached shadow root.
    pub shadow: Vec<NodeSpec>,
    pub frame: Option<FrameSpec>,
}

/// Wire format for iframe content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameSpec {
    pub cross_origin: bool,
    /// Root of the framed document; absent for cross-origin frames.
    pub document: Option<Box<NodeSpec>>,
}

/// Wire format for a whole capture.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotSpec {
    #[serde(default)]
    pub viewport: Viewport,
    pub root: NodeSpec,
}

/// Immutable DOM snapshot, the input of every detection cycle.
#[derive(Debug, Clone)]
pub struct DomSnapshot {
    viewport: Viewport,
    nodes: Vec<Node>,
    root: NodeId,
}

impl DomSnapshot {
    /// Parse a host capture from its JSON form.
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        let spec: SnapshotSpec = serde_json::from_str(input)?;
        Ok(Self::from_spec(spec))
    }

    /// Parse a host capture from an already-deserialized JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let spec: SnapshotSpec = serde_json::from_value(value)?;
        Ok(Self::from_spec(spec))
    }

    pub fn from_spec(spec: SnapshotSpec) -> Self {
        let mut snapshot = Self {
            viewport: spec.viewport,
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = snapshot.insert(spec.root, None);
        snapshot.root = root;
        snapshot
    }

    fn insert(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: spec.tag.to_ascii_lowercase(),
            attrs: spec.attrs,
            style: spec.style,
            rect: spec.rect,
            text: spec.text,
            parent,
            children: Vec::new(),
            shadow_children: Vec::new(),
            frame: None,
        });

        let children: Vec<NodeId> = spec
            .children
            .into_iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        self.nodes[id.0].children = children;

        let shadow: Vec<NodeId> = spec
            .shadow
            .into_iter()
            .map(|child| self.insert(child, Some(id)))
            .collect();
        self.nodes[id.0].shadow_children = shadow;

        if let Some(frame) = spec.frame {
            let contents = if frame.cross_origin {
                Some(FrameContents::CrossOrigin)
            } else {
                frame.document.map(|doc| FrameContents::SameOrigin {
                    document: self.insert(*doc, Some(id)),
                })
            };
            self.nodes[id.0].frame = contents;
        }

        id
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Pre-order walk of `root` and its light-tree descendants.
    ///
    /// Shadow trees and framed documents are deliberately not crossed;
    /// selector queries share the non-piercing semantics of
    /// `querySelectorAll`, and the shadow/iframe classifiers do their own
    /// boundary-aware walks.
    pub fn subtree(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        SubtreeIter {
            snapshot: self,
            stack: vec![root],
        }
    }

    /// Pre-order walk of the whole light document.
    pub fn document_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subtree(self.root)
    }

    /// All light-tree descendant text of `id`, joined with single spaces.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node_id in self.subtree(id) {
            let piece = self.node(node_id).text.trim();
            if piece.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
        }
        out
    }

    /// Whether `ancestor` contains `id` in its light tree (strictly).
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).parent;
        }
        false
    }

    /// All nodes under `scope` matching `list`, in document order.
    pub fn select_in(&self, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
        self.subtree(scope)
            .filter(|&id| list.matches(self, id))
            .collect()
    }

    /// All document nodes matching `list`, in document order.
    pub fn select(&self, list: &SelectorList) -> Vec<NodeId> {
        self.select_in(self.root, list)
    }

    /// Short human-readable locator for diagnostics: `div#id.class1.class2`.
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut out = node.tag.clone();
        if let Some(elem_id) = &node.attrs.id {
            out.push('#');
            out.push_str(elem_id);
        }
        for class in node.attrs.class_list() {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}

struct SubtreeIter<'a> {
    snapshot: &'a DomSnapshot,
    stack: Vec<NodeId>,
}

impl Iterator for SubtreeIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let node = self.snapshot.node(id);
        // Reverse push keeps document order on pop.
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> DomSnapshot {
        DomSnapshot::from_value(json!({
            "viewport": {"width": 1000.0, "height": 700.0},
            "root": {
                "tag": "BODY",
                "children": [
                    {"tag": "div", "attrs": {"id": "wrap", "class": "outer shell"},
                     "text": "hello",
                     "children": [
                        {"tag": "p", "text": "world"},
                        {"tag": "button", "text": "OK"}
                     ]},
                    {"tag": "div", "shadow": [
                        {"tag": "section", "text": "shadowed"}
                    ]}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn builds_arena_in_document_order() {
        let snap = fixture();
        let tags: Vec<&str> = snap
            .document_order()
            .map(|id| snap.node(id).tag.as_str())
            .collect();
        // Shadow children are not part of the light walk.
        assert_eq!(tags, ["body", "div", "p", "button", "div"]);
    }

    #[test]
    fn tag_names_are_lowercased() {
        let snap = fixture();
        assert_eq!(snap.node(snap.root()).tag, "body");
    }

    #[test]
    fn text_content_joins_descendants() {
        let snap = fixture();
        let wrap = snap
            .document_order()
            .find(|&id| snap.node(id).attrs.id.as_deref() == Some("wrap"))
            .unwrap();
        assert_eq!(snap.text_content(wrap), "hello world OK");
    }

    #[test]
    fn descendant_relationship() {
        let snap = fixture();
        let wrap = snap
            .document_order()
            .find(|&id| snap.node(id).attrs.id.as_deref() == Some("wrap"))
            .unwrap();
        let button = snap
            .document_order()
            .find(|&id| snap.node(id).tag == "button")
            .unwrap();
        assert!(snap.is_descendant_of(button, wrap));
        assert!(snap.is_descendant_of(button, snap.root()));
        assert!(!snap.is_descendant_of(wrap, button));
    }

    #[test]
    fn missing_attributes_yield_none() {
        let snap = fixture();
        let root = snap.node(snap.root());
        assert_eq!(root.attrs.get("id"), None);
        assert_eq!(root.attrs.get("nonexistent"), None);
        assert_eq!(root.attrs.class_list().count(), 0);
    }

    #[test]
    fn describe_is_compact() {
        let snap = fixture();
        let wrap = snap
            .document_order()
            .find(|&id| snap.node(id).attrs.id.as_deref() == Some("wrap"))
            .unwrap();
        assert_eq!(snap.describe(wrap), "div#wrap.outer.shell");
    }

    #[test]
    fn cross_origin_frame_has_no_document() {
        let snap = DomSnapshot::from_value(json!({
            "root": {"tag": "body", "children": [
                {"tag": "iframe", "frame": {"crossOrigin": true}}
            ]}
        }))
        .unwrap();
        let iframe = snap
            .document_order()
            .find(|&id| snap.node(id).tag == "iframe")
            .unwrap();
        assert_eq!(
            snap.node(iframe).frame.as_ref(),
            Some(&FrameContents::CrossOrigin)
        );
    }
}

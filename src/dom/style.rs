//! Computed-style values as captured by the host.
//!
//! Only the properties the detection heuristics consume are carried. Values
//! are the *computed* ones: inheritance and cascade are already resolved at
//! capture time, so classifiers never look at ancestors to interpret them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Computed `position` value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    /// Whether the element is taken out of normal flow and layered above it.
    pub fn is_overlay(self) -> bool {
        matches!(self, Position::Fixed | Position::Sticky | Position::Absolute)
    }

    /// Whether the element stays pinned while the page scrolls.
    pub fn is_pinned(self) -> bool {
        matches!(self, Position::Fixed | Position::Sticky)
    }
}

/// Computed style subset for one element.
///
/// `display` and `visibility` stay as raw strings: the DOM is an untyped,
/// adversarial source and hosts report whatever the page computed. Absent
/// properties deserialize to the browser defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f32,
    pub position: Position,
    pub z_index: Option<i32>,
    /// Alpha channel of the computed background color, in [0, 1].
    pub background_alpha: f32,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            position: Position::Static,
            z_index: None,
            background_alpha: 1.0,
        }
    }
}

impl ComputedStyle {
    /// Effective stacking order; auto z-index ranks lowest.
    pub fn stacking_order(&self) -> i32 {
        self.z_index.unwrap_or(0)
    }

    /// Whether the element paints with any transparency, either through
    /// its own opacity or an alpha-channel background.
    pub fn is_translucent(&self) -> bool {
        (self.opacity > 0.0 && self.opacity < 1.0) || self.background_alpha < 1.0
    }
}

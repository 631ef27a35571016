//! Viewport and bounding-box geometry shared by the whole detection stack.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Viewport dimensions of the captured page, in CSS pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Rendered bounding box of an element in viewport coordinates.
///
/// A zero-area box means the element did not produce layout; the host
/// capture reports `0×0` for collapsed or unrendered subtrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box occupies any rendered area at all.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Fraction of the viewport width this box spans, in [0, 1+].
    pub fn width_fraction(&self, viewport: &Viewport) -> f64 {
        if viewport.width <= 0.0 {
            return 0.0;
        }
        self.width / viewport.width
    }

    /// Fraction of the viewport height this box spans, in [0, 1+].
    pub fn height_fraction(&self, viewport: &Viewport) -> f64 {
        if viewport.height <= 0.0 {
            return 0.0;
        }
        self.height / viewport.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

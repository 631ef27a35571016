//! Confidence levels assigned by the classifiers.
//!
//! The values encode a strict reliability ladder: a selector hit on the
//! maintained platform database is treated as ground truth, accessibility
//! structure ranks just below it, and purely textual or structural
//! evidence is capped so it can never outrank either.

/// Selector hit on a curated platform entry; no gradation below certainty.
pub const KNOWN_CMP: f32 = 0.95;

/// Well-formed accessibility dialog with consent text and controls.
pub const ARIA: f32 = 0.85;

/// Consent content nested under a full-viewport dimming layer.
pub const BACKDROP: f32 = 0.75;

/// Consent content found inside an attached shadow tree.
pub const SHADOW_DOM: f32 = 0.7;

/// Consent content found inside a readable same-origin iframe.
pub const IFRAME: f32 = 0.65;

/// Generic CSS pattern hit; weakest single signal in the cascade.
pub const CSS_PATTERN: f32 = 0.6;

/// Keyword matcher baseline for the minimum two hits.
pub const KEYWORD_BASE: f32 = 0.7;
/// Keyword matcher increment per hit.
pub const KEYWORD_STEP: f32 = 0.05;
/// Keyword evidence alone never reaches near-certainty.
pub const KEYWORD_CAP: f32 = 0.9;

/// Structural scorer starting point before weighted contributions.
pub const GENERIC_BASE: f32 = 0.4;
/// Structural scores below this are not admitted as candidates.
pub const GENERIC_FLOOR: f32 = 0.5;
/// Structural evidence stays below the platform-database ceiling.
pub const GENERIC_CAP: f32 = 0.95;

//! Heuristic banner classifiers.
//!
//! Each classifier is an independent, side-effect-free heuristic over one
//! DOM snapshot: it either nominates a single banner candidate with a
//! confidence score or abstains. The engine runs the whole cascade and
//! keeps the best survivor; classifiers never see each other's output.
//!
//! Classifiers must be infallible at their boundary. Fallible internals
//! (selector strings from the external database, above all) degrade to
//! abstention with a debug log, so one broken pattern entry cannot take
//! the rest of the cascade down with it.

pub mod aria;
pub mod backdrop;
pub mod confidence;
pub mod css_pattern;
pub mod frames;
pub mod keyword;
pub mod known_cmp;
pub mod shadow;
pub mod structural;
pub mod support;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dom::{DomSnapshot, NodeId};
use crate::patterns::{Lexicon, PatternDb};

pub use aria::AriaMatcher;
pub use backdrop::BackdropMatcher;
pub use css_pattern::CssPatternMatcher;
pub use keyword::KeywordMatcher;
pub use known_cmp::KnownCmpMatcher;
pub use shadow::ShadowDomMatcher;
pub use structural::StructuralScorer;

/// Which heuristic produced a detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierKind {
    KnownCmp,
    Aria,
    Backdrop,
    ShadowDom,
    Keyword,
    Generic,
    CssPattern,
}

impl ClassifierKind {
    /// Tie-break rank for equal confidence: lower wins. The order reflects
    /// each method's baseline reliability, curated database first.
    pub fn priority(self) -> u8 {
        match self {
            ClassifierKind::KnownCmp => 0,
            ClassifierKind::Aria => 1,
            ClassifierKind::Backdrop => 2,
            ClassifierKind::ShadowDom => 3,
            ClassifierKind::Keyword => 4,
            ClassifierKind::Generic => 5,
            ClassifierKind::CssPattern => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::KnownCmp => "knownCmp",
            ClassifierKind::Aria => "aria",
            ClassifierKind::Backdrop => "backdrop",
            ClassifierKind::ShadowDom => "shadowDom",
            ClassifierKind::Keyword => "keyword",
            ClassifierKind::Generic => "generic",
            ClassifierKind::CssPattern => "cssPattern",
        }
    }
}

/// One classifier's nominated banner.
///
/// `banner` references the snapshot that produced this detection and is
/// never valid beyond it; detections are per-cycle values, superseded by
/// the next cycle and discarded on navigation.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub kind: ClassifierKind,
    pub banner: NodeId,
    /// Certainty in [0, 1] that `banner` really is a consent banner.
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmp_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accept_selectors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reject_selectors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_iframe: bool,
}

impl Detection {
    pub fn new(kind: ClassifierKind, banner: NodeId, confidence: f32) -> Self {
        Self {
            kind,
            banner,
            confidence,
            cmp_name: None,
            accept_selectors: Vec::new(),
            reject_selectors: Vec::new(),
            matched_keywords: Vec::new(),
            in_iframe: false,
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.matched_keywords = keywords;
        self
    }

    /// Whether this detection beats `other` under the aggregation rule:
    /// higher confidence, ties broken by classifier priority.
    pub fn outranks(&self, other: &Detection) -> bool {
        self.confidence > other.confidence
            || (self.confidence == other.confidence
                && self.kind.priority() < other.kind.priority())
    }
}

/// Shared per-cycle inputs: the snapshot plus the loaded pattern tables.
pub struct DetectionContext<'a> {
    pub snapshot: &'a DomSnapshot,
    pub patterns: &'a PatternDb,
    pub lexicon: &'a Lexicon,
}

/// A single detection heuristic. Implementations are stateless; all inputs
/// arrive through the context and at most one candidate comes back.
pub trait Classifier {
    fn kind(&self) -> ClassifierKind;
    fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection>;
}

/// The full cascade in priority order.
pub fn all_classifiers() -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(KnownCmpMatcher),
        Box::new(AriaMatcher),
        Box::new(BackdropMatcher),
        Box::new(ShadowDomMatcher),
        Box::new(KeywordMatcher),
        Box::new(StructuralScorer),
        Box::new(CssPatternMatcher),
    ]
}

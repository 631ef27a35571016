//! Actuator: turns a detection into a simulated click.
//!
//! Button resolution works outward from the strongest knowledge available:
//! platform-specific selectors scoped inside the detected banner, the same
//! selectors document-wide, then the multilingual button-text fallback.
//! The click itself is a realistic pointer sub-event sequence dispatched
//! through the host driver with short cooperative delays in between.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

use crate::classify::Detection;
use crate::classify::support::{accessible_text, actionable_controls};
use crate::dom::selector::SelectorList;
use crate::dom::{DomSnapshot, NodeId};
use crate::patterns::PatternDb;
use crate::visibility::is_visible;

/// Requested action direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Accept,
    Deny,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Accept => "accept",
            Polarity::Deny => "deny",
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when a deny request finds no reject control.
///
/// The accept fallback unblocks the page at the cost of the user's privacy
/// preference. That tradeoff is deliberate and documented, so it is a
/// policy choice rather than hardwired behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Click the accept control instead of leaving the banner up.
    #[default]
    AcceptWhenRejectMissing,
    /// Report a structured failure and leave the page alone.
    Strict,
}

/// Pointer sub-events of one simulated click, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PointerStep {
    PointerDown,
    MouseDown,
    PointerUp,
    MouseUp,
    Click,
}

/// The full sub-event sequence of a simulated click.
pub const CLICK_SEQUENCE: [PointerStep; 5] = [
    PointerStep::PointerDown,
    PointerStep::MouseDown,
    PointerStep::PointerUp,
    PointerStep::MouseUp,
    PointerStep::Click,
];

/// Cooperative pause between pointer sub-events.
pub const CLICK_STEP_DELAY: Duration = Duration::from_millis(30);

#[derive(Debug, Error)]
pub enum ActuateError {
    #[error("no visible control for polarity `{polarity}`")]
    NoControl { polarity: Polarity },
    #[error("driver failure: {0}")]
    Driver(anyhow::Error),
}

/// Outcome of a successful actuation.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Actuation {
    pub clicked: NodeId,
    /// The polarity that was requested, which the caller's intent is
    /// reported against even when the accept fallback was taken.
    pub polarity: Polarity,
    pub fell_back_to_accept: bool,
    pub completed_at: DateTime<Utc>,
}

/// Host boundary: the only party that touches the live page.
#[async_trait]
pub trait PageDriver: Send {
    /// Capture the current DOM as a snapshot.
    async fn capture(&mut self) -> anyhow::Result<DomSnapshot>;

    /// Dispatch one pointer sub-event at the element.
    async fn dispatch(&mut self, target: NodeId, step: PointerStep) -> anyhow::Result<()>;

    /// Domain of the page this driver is attached to.
    fn domain(&self) -> &str;
}

/// Driver that records dispatched events instead of touching a page.
/// Used by the CLI dry-run and by tests.
pub struct RecordingDriver {
    snapshot: DomSnapshot,
    domain: String,
    pub dispatched: Vec<(NodeId, PointerStep)>,
}

impl RecordingDriver {
    pub fn new(snapshot: DomSnapshot, domain: impl Into<String>) -> Self {
        Self {
            snapshot,
            domain: domain.into(),
            dispatched: Vec::new(),
        }
    }
}

#[async_trait]
impl PageDriver for RecordingDriver {
    async fn capture(&mut self) -> anyhow::Result<DomSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn dispatch(&mut self, target: NodeId, step: PointerStep) -> anyhow::Result<()> {
        self.dispatched.push((target, step));
        Ok(())
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

/// Plans and performs clicks against detected banners.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actuator {
    pub fallback: FallbackPolicy,
}

impl Actuator {
    pub fn new(fallback: FallbackPolicy) -> Self {
        Self { fallback }
    }

    /// Locate the concrete control for `polarity`, without clicking.
    ///
    /// Platform selectors are tried scoped inside the banner first so a
    /// page-wide id collision cannot redirect the click, then document-wide
    /// for platforms that mount their buttons outside the banner subtree,
    /// then the text fallback over actionable controls.
    pub fn resolve_control(
        &self,
        snapshot: &DomSnapshot,
        patterns: &PatternDb,
        detection: &Detection,
        polarity: Polarity,
    ) -> Option<NodeId> {
        let selectors = match polarity {
            Polarity::Accept => &detection.accept_selectors,
            Polarity::Deny => &detection.reject_selectors,
        };

        for raw in selectors {
            let Some(list) = SelectorList::parse_lenient(raw) else {
                continue;
            };
            if let Some(hit) = snapshot
                .select_in(detection.banner, &list)
                .into_iter()
                .find(|&id| is_visible(snapshot, id))
            {
                return Some(hit);
            }
        }
        for raw in selectors {
            let Some(list) = SelectorList::parse_lenient(raw) else {
                continue;
            };
            if let Some(hit) = snapshot
                .select(&list)
                .into_iter()
                .find(|&id| is_visible(snapshot, id))
            {
                return Some(hit);
            }
        }

        // Text fallback: banner-scoped controls, or the whole document when
        // the banner holds none.
        let mut controls = actionable_controls(snapshot, detection.banner);
        if controls.is_empty() {
            controls = actionable_controls(snapshot, snapshot.root());
        }
        let fragments: Vec<&str> = match polarity {
            Polarity::Accept => patterns.button_patterns.accept_fragments().collect(),
            Polarity::Deny => patterns.button_patterns.reject_fragments().collect(),
        };
        for fragment in fragments {
            for &control in &controls {
                if accessible_text(snapshot, control)
                    .to_lowercase()
                    .contains(fragment)
                {
                    return Some(control);
                }
            }
        }
        None
    }

    /// Resolve and click the control for `polarity`.
    ///
    /// Callers clear the detection cache on success: the click is expected
    /// to mutate or remove the banner.
    pub async fn actuate<D: PageDriver>(
        &self,
        driver: &mut D,
        snapshot: &DomSnapshot,
        patterns: &PatternDb,
        detection: &Detection,
        polarity: Polarity,
    ) -> Result<Actuation, ActuateError> {
        let mut fell_back = false;
        let target = match self.resolve_control(snapshot, patterns, detection, polarity) {
            Some(target) => target,
            None if polarity == Polarity::Deny
                && self.fallback == FallbackPolicy::AcceptWhenRejectMissing =>
            {
                let accept =
                    self.resolve_control(snapshot, patterns, detection, Polarity::Accept);
                match accept {
                    Some(target) => {
                        tracing::debug!("no reject control, falling back to accept");
                        fell_back = true;
                        target
                    }
                    None => return Err(ActuateError::NoControl { polarity }),
                }
            }
            None => return Err(ActuateError::NoControl { polarity }),
        };

        click(driver, target).await?;
        Ok(Actuation {
            clicked: target,
            polarity,
            fell_back_to_accept: fell_back,
            completed_at: Utc::now(),
        })
    }
}

/// Dispatch the full pointer sequence with cooperative pauses in between.
async fn click<D: PageDriver>(driver: &mut D, target: NodeId) -> Result<(), ActuateError> {
    for (index, step) in CLICK_SEQUENCE.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(CLICK_STEP_DELAY).await;
        }
        driver
            .dispatch(target, step)
            .await
            .map_err(ActuateError::Driver)?;
    }
    Ok(())
}

//! Shared fixtures for the integration tests: snapshot pages of the common
//! banner shapes plus a pattern database seeded with a known platform.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use bannersense::actuate::{PageDriver, PointerStep};
use bannersense::dom::{DomSnapshot, NodeId};
use bannersense::patterns::{CmpSelectors, KnownCmp, PatternDb};
use bannersense::session::{BannerActuated, BannerObserved, Notifier};

/// Builtin database plus a seeded OneTrust entry.
pub fn seeded_db() -> PatternDb {
    let mut db = PatternDb::builtin();
    db.known_cmps.push(KnownCmp {
        name: "OneTrust".to_string(),
        selectors: CmpSelectors {
            banner: vec!["#onetrust-banner-sdk".to_string()],
            accept_button: vec!["#onetrust-accept-btn-handler".to_string()],
            reject_button: vec!["#onetrust-reject-all-handler".to_string()],
        },
    });
    db
}

pub fn find_by_id(snap: &DomSnapshot, id: &str) -> NodeId {
    snap.document_order()
        .find(|&n| snap.node(n).attrs.id.as_deref() == Some(id))
        .unwrap_or_else(|| panic!("no element #{id} in fixture"))
}

/// Scenario A: a OneTrust banner matching the seeded platform entry.
pub fn onetrust_page() -> DomSnapshot {
    DomSnapshot::from_value(json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "div", "attrs": {"id": "onetrust-banner-sdk"},
             "style": {"position": "fixed", "zIndex": 2147483645},
             "rect": {"x": 0.0, "y": 650.0, "width": 1280.0, "height": 150.0},
             "text": "We use cookies to personalize content and analyze traffic.",
             "children": [
                {"tag": "button", "attrs": {"id": "onetrust-accept-btn-handler"},
                 "rect": {"width": 140.0, "height": 40.0}, "text": "Accept All Cookies"},
                {"tag": "button", "attrs": {"id": "onetrust-pc-btn-handler"},
                 "rect": {"width": 140.0, "height": 40.0}, "text": "Cookie Settings"}
             ]}
        ]}
    }))
    .unwrap()
}

/// Scenario B: anonymous fixed footer banner with accept/decline buttons.
pub fn footer_page() -> DomSnapshot {
    DomSnapshot::from_value(json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "main", "rect": {"width": 1280.0, "height": 800.0},
             "text": "Ordinary page content."},
            {"tag": "div", "attrs": {"id": "notice"},
             "style": {"position": "fixed", "zIndex": 9999},
             "rect": {"x": 0.0, "y": 710.0, "width": 1280.0, "height": 90.0},
             "text": "We use cookies to improve your experience.",
             "children": [
                {"tag": "button", "attrs": {"id": "ok"},
                 "rect": {"width": 100.0, "height": 36.0}, "text": "Accept"},
                {"tag": "button", "attrs": {"id": "nope"},
                 "rect": {"width": 100.0, "height": 36.0}, "text": "Decline"}
             ]}
        ]}
    }))
    .unwrap()
}

/// Scenario C: nothing consent-related anywhere.
pub fn empty_page() -> DomSnapshot {
    DomSnapshot::from_value(json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "main", "rect": {"width": 1280.0, "height": 800.0},
             "text": "Just an article about baking bread.",
             "children": [
                {"tag": "button", "rect": {"width": 90.0, "height": 30.0}, "text": "Subscribe"}
             ]}
        ]}
    }))
    .unwrap()
}

/// Scenario D: banner only inside a shadow root two levels deep.
pub fn shadow_page() -> DomSnapshot {
    DomSnapshot::from_value(json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "div", "attrs": {"id": "widget-host"}, "shadow": [
                {"tag": "div", "attrs": {"id": "inner-host"},
                 "rect": {"width": 900.0, "height": 400.0},
                 "shadow": [
                    {"tag": "div", "attrs": {"id": "shadow-banner"},
                     "rect": {"width": 700.0, "height": 180.0},
                     "text": "This site uses cookies; manage your consent preferences.",
                     "children": [
                        {"tag": "button", "attrs": {"id": "shadow-accept"},
                         "rect": {"width": 110.0, "height": 36.0}, "text": "Accept"}
                     ]}
                 ]}
            ]}
        ]}
    }))
    .unwrap()
}

/// Scenario E: accept control present, no reject control anywhere.
pub fn accept_only_page() -> DomSnapshot {
    DomSnapshot::from_value(json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "div", "attrs": {"id": "banner"},
             "style": {"position": "fixed", "zIndex": 5000},
             "rect": {"x": 0.0, "y": 700.0, "width": 1280.0, "height": 100.0},
             "text": "Cookies make this site work; accepting is the only option we offer.",
             "children": [
                {"tag": "button", "attrs": {"id": "only-accept"},
                 "rect": {"width": 110.0, "height": 36.0}, "text": "Accept cookies"}
             ]}
        ]}
    }))
    .unwrap()
}

/// Driver that serves a scripted sequence of snapshots and records every
/// dispatched pointer event. The last snapshot repeats once the script
/// runs out.
pub struct ScriptedDriver {
    snapshots: VecDeque<DomSnapshot>,
    last: DomSnapshot,
    domain: String,
    pub dispatched: Vec<(NodeId, PointerStep)>,
}

impl ScriptedDriver {
    pub fn new(snapshots: Vec<DomSnapshot>, domain: impl Into<String>) -> Self {
        let mut snapshots: VecDeque<DomSnapshot> = snapshots.into();
        let last = snapshots
            .back()
            .cloned()
            .unwrap_or_else(|| empty_page());
        if snapshots.len() == 1 {
            // A single entry acts as the steady state.
            snapshots.clear();
        }
        Self {
            snapshots,
            last,
            domain: domain.into(),
            dispatched: Vec::new(),
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn capture(&mut self) -> anyhow::Result<DomSnapshot> {
        match self.snapshots.pop_front() {
            Some(snapshot) => {
                self.last = snapshot.clone();
                Ok(snapshot)
            }
            None => Ok(self.last.clone()),
        }
    }

    async fn dispatch(&mut self, target: NodeId, step: PointerStep) -> anyhow::Result<()> {
        self.dispatched.push((target, step));
        Ok(())
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

/// Notifier that collects everything it is handed, through a shared handle
/// the test keeps after the session takes ownership.
#[derive(Clone, Default)]
pub struct NotificationLog {
    pub observed: Arc<Mutex<Vec<BannerObserved>>>,
    pub actuated: Arc<Mutex<Vec<BannerActuated>>>,
}

pub struct CollectingNotifier(pub NotificationLog);

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn banner_observed(&mut self, event: BannerObserved) -> anyhow::Result<()> {
        self.0.observed.lock().unwrap().push(event);
        Ok(())
    }

    async fn banner_actuated(&mut self, event: BannerActuated) -> anyhow::Result<()> {
        self.0.actuated.lock().unwrap().push(event);
        Ok(())
    }
}

/// Notifier whose delivery always fails; cycles must shrug it off.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn banner_observed(&mut self, _: BannerObserved) -> anyhow::Result<()> {
        anyhow::bail!("statistics endpoint unreachable")
    }

    async fn banner_actuated(&mut self, _: BannerActuated) -> anyhow::Result<()> {
        anyhow::bail!("statistics endpoint unreachable")
    }
}

//! Page session: the control surface around the detection core.
//!
//! One session exists per page lifetime. It owns the engine, the actuator,
//! the host driver, and the change monitor, and it speaks two protocols:
//! inbound serde-tagged commands (detect / actuate / configure / status),
//! each answered with a structured reply, and outbound fire-and-forget
//! notifications toward the statistics collaborator. "No banner found" is
//! a normal reply, never an error; the caller always gets a definite
//! answer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::actuate::{ActuateError, Actuator, FallbackPolicy, PageDriver, Polarity};
use crate::classify::{ClassifierKind, Detection};
use crate::config::{Mode, RuntimeConfig};
use crate::engine::DetectionEngine;
use crate::monitor::{ChangeMonitor, SETTLE_DELAY};
use crate::patterns::PatternDb;

/// Inbound command from the UI/background collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Run a detection cycle now.
    Detect,
    /// Detect (or reuse the fresh verdict) and click the given control.
    Actuate { polarity: Polarity },
    /// Patch the runtime configuration.
    Configure {
        #[serde(default)]
        update: ConfigPatch,
    },
    /// Report current mode and flags.
    Status,
}

/// Partial configuration update; unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub mode: Option<Mode>,
    pub debug: Option<bool>,
    pub fallback: Option<FallbackPolicy>,
    pub force_accept: Option<Vec<String>>,
    pub skip: Option<Vec<String>>,
}

impl ConfigPatch {
    pub fn apply_to(&self, config: &mut RuntimeConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }
        if let Some(force_accept) = &self.force_accept {
            config.domains.force_accept = force_accept.clone();
        }
        if let Some(skip) = &self.skip {
            config.domains.skip = skip.clone();
        }
    }
}

/// Structured answer to one command.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum Reply {
    Detected {
        kind: ClassifierKind,
        confidence: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        cmp_name: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        in_iframe: bool,
    },
    NoBanner,
    Actuated {
        polarity: Polarity,
        fell_back_to_accept: bool,
    },
    NoControl {
        polarity: Polarity,
    },
    /// The domain is on the skip list; nothing was touched.
    Skipped {
        domain: String,
    },
    /// A cycle is already in flight; this request was dropped, not queued.
    Busy,
    Configured,
    Status {
        mode: Mode,
        debug: bool,
        domain: String,
    },
    Failed {
        message: String,
    },
}

/// "Banner observed" notification payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BannerObserved {
    pub kind: ClassifierKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmp_name: Option<String>,
    pub confidence: f32,
}

/// "Banner actuated" notification payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BannerActuated {
    pub polarity: Polarity,
    pub fell_back_to_accept: bool,
    pub at: DateTime<Utc>,
}

/// Outbound notification edge. Best effort: the session logs and swallows
/// delivery failures, and never lets them abort a cycle.
#[async_trait]
pub trait Notifier: Send {
    async fn banner_observed(&mut self, event: BannerObserved) -> anyhow::Result<()>;
    async fn banner_actuated(&mut self, event: BannerActuated) -> anyhow::Result<()>;
}

/// Notifier that drops everything; for hosts without a statistics edge.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn banner_observed(&mut self, _: BannerObserved) -> anyhow::Result<()> {
        Ok(())
    }

    async fn banner_actuated(&mut self, _: BannerActuated) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Event feeding [`Session::run`].
#[derive(Debug)]
pub enum SessionEvent {
    Command {
        command: Command,
        reply: oneshot::Sender<Reply>,
    },
    /// The host observed a DOM mutation burst.
    Mutation,
}

pub struct Session<D: PageDriver, N: Notifier> {
    engine: DetectionEngine,
    actuator: Actuator,
    driver: D,
    notifier: N,
    config: RuntimeConfig,
    monitor: ChangeMonitor,
    in_flight: bool,
}

impl<D: PageDriver, N: Notifier> Session<D, N> {
    /// Session with the standard cascade and the configured pattern file.
    pub fn new(driver: D, notifier: N, config: RuntimeConfig) -> Self {
        let patterns = PatternDb::load_or_builtin(config.patterns_path.as_deref());
        Self::with_engine(DetectionEngine::standard(patterns), driver, notifier, config)
    }

    pub fn with_engine(
        engine: DetectionEngine,
        driver: D,
        notifier: N,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            engine,
            actuator: Actuator::new(config.fallback),
            driver,
            notifier,
            config,
            monitor: ChangeMonitor::default(),
            in_flight: false,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Claim the single in-flight slot. A false return means a cycle is
    /// already running and the new request must be dropped; the trailing
    /// debounce will schedule another pass if the DOM keeps changing.
    pub fn begin_cycle(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn end_cycle(&mut self) {
        self.in_flight = false;
    }

    pub async fn handle_command(&mut self, command: Command) -> Reply {
        match command {
            Command::Detect => self.guarded_detect().await,
            Command::Actuate { polarity } => self.guarded_actuate(polarity).await,
            Command::Configure { update } => {
                update.apply_to(&mut self.config);
                self.actuator = Actuator::new(self.config.fallback);
                Reply::Configured
            }
            Command::Status => Reply::Status {
                mode: self.config.mode,
                debug: self.config.debug,
                domain: self.driver.domain().to_string(),
            },
        }
    }

    /// Record a mutation burst; the debounced re-scan deadline resets.
    pub fn note_mutation(&mut self) {
        self.monitor.note_mutation(Instant::now());
    }

    /// Drive the session until the event channel closes: initial settle
    /// delay, first detection pass, then commands, mutations, and
    /// debounced re-scans.
    pub async fn run(&mut self, mut events: mpsc::Receiver<SessionEvent>) {
        tokio::time::sleep(SETTLE_DELAY).await;
        self.auto_cycle().await;

        loop {
            match self.monitor.deadline() {
                Some(deadline) => {
                    tokio::select! {
                        event = events.recv() => match event {
                            Some(event) => self.handle_event(event).await,
                            None => break,
                        },
                        _ = tokio::time::sleep_until(deadline) => {
                            if self.monitor.take_due(Instant::now()) {
                                self.auto_cycle().await;
                            }
                        }
                    }
                }
                None => match events.recv().await {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Command { command, reply } => {
                let answer = self.handle_command(command).await;
                // A dropped receiver just means nobody cares anymore.
                let _ = reply.send(answer);
            }
            SessionEvent::Mutation => self.note_mutation(),
        }
    }

    /// Scheduled (settle / debounce) cycle: behavior follows the mode.
    async fn auto_cycle(&mut self) {
        let reply = match self.config.mode {
            Mode::Monitor => self.guarded_detect().await,
            Mode::AutoAccept => self.guarded_actuate(Polarity::Accept).await,
            Mode::AutoDeny => self.guarded_actuate(Polarity::Deny).await,
        };
        tracing::debug!(?reply, "scheduled cycle finished");
    }

    async fn guarded_detect(&mut self) -> Reply {
        if !self.begin_cycle() {
            tracing::debug!("detection already in flight, dropping request");
            return Reply::Busy;
        }
        let reply = self.detect_cycle().await;
        self.end_cycle();
        reply
    }

    async fn detect_cycle(&mut self) -> Reply {
        let snapshot = match self.driver.capture().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return Reply::Failed {
                    message: err.to_string(),
                };
            }
        };
        match self.engine.detect(&snapshot) {
            Some(detection) => {
                self.notify_observed(&detection).await;
                Reply::Detected {
                    kind: detection.kind,
                    confidence: detection.confidence,
                    cmp_name: detection.cmp_name,
                    in_iframe: detection.in_iframe,
                }
            }
            None => Reply::NoBanner,
        }
    }

    async fn guarded_actuate(&mut self, polarity: Polarity) -> Reply {
        if !self.begin_cycle() {
            tracing::debug!("cycle already in flight, dropping actuation request");
            return Reply::Busy;
        }
        let reply = self.actuate_cycle(polarity).await;
        self.end_cycle();
        reply
    }

    async fn actuate_cycle(&mut self, requested: Polarity) -> Reply {
        let domain = self.driver.domain().to_string();
        if self.config.domains.is_skipped(&domain) {
            return Reply::Skipped { domain };
        }
        let polarity = if self.config.domains.is_force_accept(&domain) {
            Polarity::Accept
        } else {
            requested
        };

        let snapshot = match self.driver.capture().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return Reply::Failed {
                    message: err.to_string(),
                };
            }
        };
        let Some(detection) = self.engine.detect(&snapshot) else {
            return Reply::NoBanner;
        };

        let outcome = self
            .actuator
            .actuate(
                &mut self.driver,
                &snapshot,
                self.engine.patterns(),
                &detection,
                polarity,
            )
            .await;
        match outcome {
            Ok(actuation) => {
                // The click mutates the page; the cached verdict is stale.
                self.engine.clear_cache();
                let event = BannerActuated {
                    polarity: actuation.polarity,
                    fell_back_to_accept: actuation.fell_back_to_accept,
                    at: actuation.completed_at,
                };
                if let Err(err) = self.notifier.banner_actuated(event).await {
                    tracing::debug!(%err, "dropping banner_actuated notification");
                }
                Reply::Actuated {
                    polarity: requested,
                    fell_back_to_accept: actuation.fell_back_to_accept,
                }
            }
            Err(ActuateError::NoControl { polarity }) => Reply::NoControl { polarity },
            Err(err) => Reply::Failed {
                message: err.to_string(),
            },
        }
    }

    async fn notify_observed(&mut self, detection: &Detection) {
        let event = BannerObserved {
            kind: detection.kind,
            cmp_name: detection.cmp_name.clone(),
            confidence: detection.confidence,
        };
        if let Err(err) = self.notifier.banner_observed(event).await {
            tracing::debug!(%err, "dropping banner_observed notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_as_tagged_json() {
        let command: Command =
            serde_json::from_str(r#"{"command": "actuate", "polarity": "deny"}"#).unwrap();
        assert_eq!(
            command,
            Command::Actuate {
                polarity: Polarity::Deny
            }
        );

        let command: Command = serde_json::from_str(
            r#"{"command": "configure", "update": {"mode": "auto_accept", "skip": ["bank.example"]}}"#,
        )
        .unwrap();
        let Command::Configure { update } = command else {
            panic!("wrong variant");
        };
        assert_eq!(update.mode, Some(Mode::AutoAccept));
        assert_eq!(update.skip.as_deref(), Some(["bank.example".to_string()].as_slice()));
    }

    #[test]
    fn replies_serialize_with_tag() {
        let reply = Reply::NoControl {
            polarity: Polarity::Deny,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["reply"], "noControl");
        assert_eq!(json["polarity"], "deny");

        let reply = Reply::NoBanner;
        assert_eq!(
            serde_json::to_value(&reply).unwrap()["reply"],
            "noBanner"
        );
    }

    #[test]
    fn config_patch_applies_partially() {
        let mut config = RuntimeConfig::default();
        let patch = ConfigPatch {
            mode: Some(Mode::AutoDeny),
            skip: Some(vec!["bank.example".to_string()]),
            ..ConfigPatch::default()
        };
        patch.apply_to(&mut config);
        assert_eq!(config.mode, Mode::AutoDeny);
        assert!(config.domains.is_skipped("bank.example"));
        // Untouched fields keep their values.
        assert!(!config.debug);
        assert_eq!(config.fallback, FallbackPolicy::AcceptWhenRejectMissing);
    }
}

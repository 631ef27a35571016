//! Runtime configuration.
//!
//! Loaded from `config.toml` under the platform config directory, with
//! serde defaults filling any partial file; the control surface can patch
//! individual fields at runtime. All of it is policy; the detector itself
//! is configuration-free.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::actuate::FallbackPolicy;

/// What the agent does with a detected banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Detect and notify, never click.
    #[default]
    Monitor,
    /// Actuate the accept control automatically.
    AutoAccept,
    /// Actuate the reject control automatically.
    AutoDeny,
}

/// Domain allow/deny policy, consumed by the session before actuation.
///
/// Matching is by exact host or any subdomain of a listed entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DomainPolicy {
    /// Domains always actuated with accept, regardless of mode.
    pub force_accept: Vec<String>,
    /// Domains the agent leaves entirely alone.
    pub skip: Vec<String>,
}

impl DomainPolicy {
    fn listed(list: &[String], domain: &str) -> bool {
        list.iter()
            .any(|entry| domain == entry || domain.ends_with(&format!(".{entry}")))
    }

    pub fn is_skipped(&self, domain: &str) -> bool {
        Self::listed(&self.skip, domain)
    }

    pub fn is_force_accept(&self, domain: &str) -> bool {
        Self::listed(&self.force_accept, domain)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: Mode,
    /// Log every classifier verdict; off by default so production pages do
    /// not see operational detail in their console.
    pub debug: bool,
    pub fallback: FallbackPolicy,
    /// Pattern database location; `None` means the builtin default.
    /// Kept ahead of the table-valued field for TOML serialization.
    pub patterns_path: Option<PathBuf>,
    pub domains: DomainPolicy,
}

impl RuntimeConfig {
    /// Load from the config file, falling back to defaults on any failure.
    pub fn load() -> Self {
        if let Some(path) = Self::config_file_path()
            && let Ok(content) = std::fs::read_to_string(path)
            && let Ok(config) = toml::from_str(&content)
        {
            return config;
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = Self::config_file_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("bannersense");
            path.push("config.toml");
            path
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let config = RuntimeConfig::default();
        assert_eq!(config.mode, Mode::Monitor);
        assert!(!config.debug);
        assert_eq!(config.fallback, FallbackPolicy::AcceptWhenRejectMissing);
        assert!(config.domains.skip.is_empty());
        assert_eq!(config.patterns_path, None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
mode = "auto_deny"

[domains]
skip = ["bank.example"]
"#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::AutoDeny);
        assert!(!config.debug);
        assert!(config.domains.is_skipped("bank.example"));
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = RuntimeConfig {
            mode: Mode::AutoAccept,
            domains: DomainPolicy {
                force_accept: vec!["news.example".to_string()],
                skip: Vec::new(),
            },
            ..RuntimeConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: RuntimeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn domain_matching_covers_subdomains() {
        let policy = DomainPolicy {
            force_accept: vec!["shop.example".to_string()],
            skip: vec!["bank.example".to_string()],
        };
        assert!(policy.is_skipped("bank.example"));
        assert!(policy.is_skipped("login.bank.example"));
        assert!(!policy.is_skipped("notbank.example"));
        assert!(policy.is_force_accept("www.shop.example"));
        assert!(!policy.is_force_accept("shop.example.evil.com"));
    }
}

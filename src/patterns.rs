//! Pattern database: the declarative knowledge driving detection.
//!
//! Four tables, loaded once per page session from a JSON document the host
//! ships alongside the agent: known consent-platform selectors, localized
//! accept/reject button vocabulary, generic banner CSS patterns, and the
//! consent keyword lexicon. When the file is missing or malformed the
//! engine degrades to a minimal built-in database instead of failing
//! detection outright.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("failed to read pattern database: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse pattern database: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One consent-management platform with curated selectors.
///
/// Database order encodes precedence: the first matching platform wins, so
/// overlapping selector sets resolve deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct KnownCmp {
    pub name: String,
    pub selectors: CmpSelectors,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CmpSelectors {
    pub banner: Vec<String>,
    pub accept_button: Vec<String>,
    pub reject_button: Vec<String>,
}

/// Lowercase button-text fragments per language, ordered by precedence
/// ("accept all" must be tried before "accept").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ButtonPatterns {
    pub accept: BTreeMap<String, Vec<String>>,
    pub reject: BTreeMap<String, Vec<String>>,
}

impl ButtonPatterns {
    /// Accept fragments across all languages, precedence order per language.
    pub fn accept_fragments(&self) -> impl Iterator<Item = &str> + Clone {
        self.accept.values().flatten().map(String::as_str)
    }

    /// Reject fragments across all languages, precedence order per language.
    pub fn reject_fragments(&self) -> impl Iterator<Item = &str> + Clone {
        self.reject.values().flatten().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CssPatterns {
    /// Selectors plausibly matching banner containers.
    pub banner: Vec<String>,
    /// Selectors plausibly matching dimming overlay layers.
    pub overlay: Vec<String>,
}

/// The full declarative database.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternDb {
    pub known_cmps: Vec<KnownCmp>,
    pub button_patterns: ButtonPatterns,
    pub css_patterns: CssPatterns,
    /// Lowercase consent-domain terms per language code.
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl PatternDb {
    /// Minimal built-in fallback used when no database can be loaded:
    /// no platform entries, a small English button vocabulary, one generic
    /// cookie-class selector, and a small English keyword set. Detection
    /// degrades but keeps working.
    pub fn builtin() -> Self {
        let lang = |words: &[&str]| {
            BTreeMap::from([(
                "en".to_string(),
                words.iter().map(|w| w.to_string()).collect(),
            )])
        };
        Self {
            known_cmps: Vec::new(),
            button_patterns: ButtonPatterns {
                accept: lang(&["accept all", "accept", "agree", "allow all", "allow", "got it"]),
                reject: lang(&[
                    "reject all",
                    "reject",
                    "decline",
                    "deny",
                    "refuse",
                    "only necessary",
                    "necessary only",
                ]),
            },
            css_patterns: CssPatterns {
                banner: vec!["[class*=cookie]".to_string()],
                overlay: Vec::new(),
            },
            keywords: lang(&["cookie", "cookies", "consent", "gdpr", "privacy"]),
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, PatternError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, PatternError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load `path` if given and well-formed, otherwise the builtin default.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(db) => db,
                Err(err) => {
                    tracing::debug!(path = %path.display(), %err, "pattern database unusable, using builtin");
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }
}

/// Precompiled word-boundary matcher over the keyword lexicon.
///
/// One case-insensitive alternation per language; built once per database
/// load so classifiers pay no regex-compilation cost per cycle. Boundary
/// anchoring keeps substrings out: "cookiebotx" contributes nothing to a
/// "cookie" count.
#[derive(Debug, Clone)]
pub struct Lexicon {
    languages: Vec<(String, Regex)>,
}

impl Lexicon {
    pub fn compile(db: &PatternDb) -> Self {
        let mut languages = Vec::new();
        for (lang, terms) in &db.keywords {
            let escaped: Vec<String> = terms
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| regex::escape(t.trim()))
                .collect();
            if escaped.is_empty() {
                continue;
            }
            let pattern = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
            match Regex::new(&pattern) {
                Ok(regex) => languages.push((lang.clone(), regex)),
                Err(err) => {
                    tracing::debug!(lang = %lang, %err, "skipping uncompilable keyword set");
                }
            }
        }
        Self { languages }
    }

    /// Every keyword occurrence in `text`, lowercased; repeats count.
    pub fn hits(&self, text: &str) -> Vec<String> {
        let mut hits = Vec::new();
        for (_, regex) in &self.languages {
            for found in regex.find_iter(text) {
                hits.push(found.as_str().to_lowercase());
            }
        }
        hits
    }

    pub fn hit_count(&self, text: &str) -> usize {
        self.languages
            .iter()
            .map(|(_, regex)| regex.find_iter(text).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

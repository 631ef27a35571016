//! Detection engine: runs the classifier cascade and caches the verdict.
//!
//! The engine owns all detection state for one page context: the pattern
//! database, the compiled lexicon, the registered classifiers, and the
//! single-slot verdict cache. Exactly one instance exists per page
//! lifetime; there are no globals.

use std::time::{Duration, Instant};

use crate::classify::{self, Classifier, Detection, DetectionContext};
use crate::dom::DomSnapshot;
use crate::patterns::{Lexicon, PatternDb};

/// How long a cached verdict (found or not-found) stays servable.
pub const CACHE_FRESHNESS: Duration = Duration::from_secs(2);

/// Single-slot verdict cache.
///
/// Keyed by nothing but time: the page is one evolving document, so the
/// last verdict either is still fresh or must be recomputed. A cached
/// "no banner" is as valid an entry as a hit.
#[derive(Debug, Default)]
struct VerdictCache {
    slot: Option<(Option<Detection>, Instant)>,
}

impl VerdictCache {
    fn fresh(&self, ttl: Duration) -> Option<Option<Detection>> {
        let (verdict, stored_at) = self.slot.as_ref()?;
        if stored_at.elapsed() < ttl {
            Some(verdict.clone())
        } else {
            None
        }
    }

    fn store(&mut self, verdict: Option<Detection>) {
        self.slot = Some((verdict, Instant::now()));
    }

    fn clear(&mut self) {
        self.slot = None;
    }
}

pub struct DetectionEngine {
    classifiers: Vec<Box<dyn Classifier>>,
    patterns: PatternDb,
    lexicon: Lexicon,
    cache: VerdictCache,
    cache_ttl: Duration,
}

impl DetectionEngine {
    /// Engine with no classifiers registered; callers add their own.
    pub fn new(patterns: PatternDb) -> Self {
        let lexicon = Lexicon::compile(&patterns);
        Self {
            classifiers: Vec::new(),
            patterns,
            lexicon,
            cache: VerdictCache::default(),
            cache_ttl: CACHE_FRESHNESS,
        }
    }

    /// Engine with the full standard cascade.
    pub fn standard(patterns: PatternDb) -> Self {
        let mut engine = Self::new(patterns);
        engine.classifiers = classify::all_classifiers();
        engine
    }

    pub fn register<C: Classifier + 'static>(mut self, classifier: C) -> Self {
        self.classifiers.push(Box::new(classifier));
        self
    }

    /// Override the cache freshness window (tests mostly).
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn patterns(&self) -> &PatternDb {
        &self.patterns
    }

    /// One detection cycle against `snapshot`, serving a fresh cached
    /// verdict when one exists.
    pub fn detect(&mut self, snapshot: &DomSnapshot) -> Option<Detection> {
        if let Some(cached) = self.cache.fresh(self.cache_ttl) {
            tracing::debug!(hit = cached.is_some(), "serving cached verdict");
            return cached;
        }
        let verdict = self.scan(snapshot);
        self.cache.store(verdict.clone());
        verdict
    }

    /// Run the full cascade, ignoring and not touching the cache.
    ///
    /// All classifiers run even after a candidate is found: the result is
    /// the global confidence maximum, with ties broken by classifier
    /// priority, and a failed heuristic never stops the rest.
    pub fn scan(&self, snapshot: &DomSnapshot) -> Option<Detection> {
        let ctx = DetectionContext {
            snapshot,
            patterns: &self.patterns,
            lexicon: &self.lexicon,
        };
        let mut best: Option<Detection> = None;
        for classifier in &self.classifiers {
            let verdict = classifier.classify(&ctx);
            match &verdict {
                Some(found) => tracing::debug!(
                    classifier = classifier.kind().as_str(),
                    confidence = found.confidence as f64,
                    banner = %snapshot.describe(found.banner),
                    "classifier verdict"
                ),
                None => tracing::debug!(
                    classifier = classifier.kind().as_str(),
                    "classifier abstained"
                ),
            }
            if let Some(candidate) = verdict
                && best.as_ref().is_none_or(|b| candidate.outranks(b))
            {
                best = Some(candidate);
            }
        }
        best
    }

    /// Drop the cached verdict so the next `detect` recomputes.
    ///
    /// The actuator calls this after any successful click: actuation is
    /// expected to mutate or remove the banner, so the cached verdict is
    /// stale by construction.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierKind;
    use crate::dom::DomSnapshot;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn empty_snapshot() -> DomSnapshot {
        DomSnapshot::from_value(json!({"root": {"tag": "body"}})).unwrap()
    }

    /// Fixed-verdict classifier that counts invocations.
    struct Probe {
        kind: ClassifierKind,
        confidence: f32,
        calls: Rc<Cell<usize>>,
    }

    impl Classifier for Probe {
        fn kind(&self) -> ClassifierKind {
            self.kind
        }

        fn classify(&self, ctx: &DetectionContext<'_>) -> Option<Detection> {
            self.calls.set(self.calls.get() + 1);
            Some(Detection::new(
                self.kind,
                ctx.snapshot.root(),
                self.confidence,
            ))
        }
    }

    fn probe(kind: ClassifierKind, confidence: f32) -> (Probe, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Probe {
                kind,
                confidence,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[test]
    fn returns_global_confidence_maximum() {
        let (low, _) = probe(ClassifierKind::KnownCmp, 0.6);
        let (high, _) = probe(ClassifierKind::Generic, 0.9);
        let mut engine = DetectionEngine::new(crate::patterns::PatternDb::builtin())
            .register(low)
            .register(high);
        let verdict = engine.detect(&empty_snapshot()).unwrap();
        assert_eq!(verdict.kind, ClassifierKind::Generic);
    }

    #[test]
    fn equal_confidence_resolves_by_priority() {
        let (generic, _) = probe(ClassifierKind::Generic, 0.8);
        let (aria, _) = probe(ClassifierKind::Aria, 0.8);
        // Registration order must not matter.
        let mut engine = DetectionEngine::new(crate::patterns::PatternDb::builtin())
            .register(generic)
            .register(aria);
        let verdict = engine.detect(&empty_snapshot()).unwrap();
        assert_eq!(verdict.kind, ClassifierKind::Aria);
    }

    #[test]
    fn fresh_cache_skips_recomputation() {
        let (classifier, calls) = probe(ClassifierKind::Keyword, 0.8);
        let mut engine =
            DetectionEngine::new(crate::patterns::PatternDb::builtin()).register(classifier);
        let snap = empty_snapshot();
        let first = engine.detect(&snap);
        let second = engine.detect(&snap);
        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn stale_cache_forces_recomputation() {
        let (classifier, calls) = probe(ClassifierKind::Keyword, 0.8);
        let mut engine = DetectionEngine::new(crate::patterns::PatternDb::builtin())
            .register(classifier)
            .with_cache_ttl(Duration::ZERO);
        let snap = empty_snapshot();
        engine.detect(&snap);
        engine.detect(&snap);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn negative_verdicts_are_cached() {
        struct Abstainer {
            calls: Rc<Cell<usize>>,
        }
        impl Classifier for Abstainer {
            fn kind(&self) -> ClassifierKind {
                ClassifierKind::Keyword
            }
            fn classify(&self, _: &DetectionContext<'_>) -> Option<Detection> {
                self.calls.set(self.calls.get() + 1);
                None
            }
        }
        let calls = Rc::new(Cell::new(0));
        let mut engine = DetectionEngine::new(crate::patterns::PatternDb::builtin())
            .register(Abstainer {
                calls: calls.clone(),
            });
        let snap = empty_snapshot();
        assert!(engine.detect(&snap).is_none());
        assert!(engine.detect(&snap).is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn clear_cache_forces_next_detect_to_recompute() {
        let (classifier, calls) = probe(ClassifierKind::Keyword, 0.8);
        let mut engine =
            DetectionEngine::new(crate::patterns::PatternDb::builtin()).register(classifier);
        let snap = empty_snapshot();
        engine.detect(&snap);
        engine.clear_cache();
        engine.detect(&snap);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn standard_engine_finds_nothing_on_empty_page() {
        let mut engine = DetectionEngine::standard(crate::patterns::PatternDb::builtin());
        assert!(engine.detect(&empty_snapshot()).is_none());
    }

    #[test]
    fn abstaining_classifier_does_not_block_others() {
        struct Silent;
        impl Classifier for Silent {
            fn kind(&self) -> ClassifierKind {
                ClassifierKind::KnownCmp
            }
            fn classify(&self, _: &DetectionContext<'_>) -> Option<Detection> {
                None
            }
        }
        let (classifier, _) = probe(ClassifierKind::CssPattern, 0.6);
        let mut engine = DetectionEngine::new(crate::patterns::PatternDb::builtin())
            .register(Silent)
            .register(classifier);
        let verdict = engine.detect(&empty_snapshot()).unwrap();
        assert_eq!(verdict.kind, ClassifierKind::CssPattern);
    }
}

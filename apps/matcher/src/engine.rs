//! Matcher — the one entry point import jobs call through.
//!
//! Bundles the tunables (`MatchConfig`), the synonym table and the scoring
//! backend so every call site shares the same policy. Holds an
//! `Arc<dyn SimilarityScorer>`, `TieredScorer` unless swapped with
//! [`Matcher::with_scorer`].

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::{MatchConfig, MergeMode};
use crate::dedup::{reduce, reduce_fuzzy_with};
use crate::errors::MatchError;
use crate::matching::{MatchPolicy, Resolver};
use crate::models::{DedupOutcome, MatchCandidate, Record};
use crate::normalize::{canonicalize_skill, fix_typos, SynonymTable};
use crate::scoring::{SimilarityScorer, TieredScorer};

/// Key in `Record::extra` holding a list of skill labels.
pub const SKILLS_FIELD: &str = "skills";

#[derive(Clone)]
pub struct Matcher {
    config: MatchConfig,
    synonyms: SynonymTable,
    scorer: Arc<dyn SimilarityScorer>,
}

impl Matcher {
    pub fn new(config: MatchConfig, synonyms: SynonymTable) -> Self {
        Self {
            config,
            synonyms,
            scorer: Arc::new(TieredScorer),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn backend(&self) -> &'static str {
        self.scorer.backend()
    }

    // ── Normalizer ──────────────────────────────────────────────────────────

    pub fn fix_typos(&self, text: &str) -> String {
        fix_typos(text, &self.synonyms)
    }

    pub fn canonicalize_skill(&self, text: &str) -> String {
        canonicalize_skill(text, &self.synonyms)
    }

    /// Canonicalizes the string entries of `extra["skills"]` in place and
    /// drops duplicates created by canonicalization. Returns how many labels
    /// changed.
    pub fn canonicalize_record_skills(&self, record: &mut Record) -> usize {
        let Some(Value::Array(items)) = record.extra.get_mut(SKILLS_FIELD) else {
            return 0;
        };

        let mut changed = 0;
        let mut seen: Vec<String> = Vec::with_capacity(items.len());
        let mut out: Vec<Value> = Vec::with_capacity(items.len());

        for item in items.drain(..) {
            let label = match item {
                Value::String(label) => label,
                other => {
                    out.push(other);
                    continue;
                }
            };
            let canonical = self.canonicalize_skill(&label);
            if canonical.is_empty() {
                changed += 1;
                continue;
            }
            if canonical != label {
                changed += 1;
            }
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical.clone());
            out.push(Value::String(canonical));
        }

        *items = out;
        if changed > 0 {
            debug!("Canonicalized {changed} skill labels on record {}", record.id);
        }
        changed
    }

    // ── Scorer ──────────────────────────────────────────────────────────────

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        self.scorer.score(a, b)
    }

    // ── Resolver ────────────────────────────────────────────────────────────

    /// Configured threshold for a policy preset.
    pub fn threshold_for(&self, policy: MatchPolicy) -> f64 {
        match policy {
            MatchPolicy::Link => self.config.match_threshold,
            MatchPolicy::Review => self.config.review_threshold,
        }
    }

    pub fn resolve<'a>(
        &self,
        candidate: &Record,
        pool: &'a [Record],
        policy: MatchPolicy,
    ) -> Result<Option<MatchCandidate<'a>>, MatchError> {
        self.resolve_with_threshold(candidate, pool, self.threshold_for(policy))
    }

    pub fn resolve_with_threshold<'a>(
        &self,
        candidate: &Record,
        pool: &'a [Record],
        threshold: f64,
    ) -> Result<Option<MatchCandidate<'a>>, MatchError> {
        self.resolver().resolve(candidate, pool, threshold)
    }

    pub fn resolve_batch<'a>(
        &self,
        candidates: &[Record],
        pool: &'a [Record],
        policy: MatchPolicy,
    ) -> Result<Vec<Option<MatchCandidate<'a>>>, MatchError> {
        self.resolver()
            .resolve_batch(candidates, pool, self.threshold_for(policy))
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.scorer.as_ref(), self.config.ambiguity_epsilon)
    }

    // ── Reducer ─────────────────────────────────────────────────────────────

    pub fn reduce(&self, records: Vec<Record>) -> Result<DedupOutcome, MatchError> {
        reduce(records)
    }

    /// Fuzzy pass at the configured link threshold.
    pub fn reduce_fuzzy(&self, records: Vec<Record>) -> Result<DedupOutcome, MatchError> {
        reduce_fuzzy_with(records, self.config.match_threshold, self.scorer.as_ref())
    }

    pub fn reduce_with_mode(
        &self,
        records: Vec<Record>,
        mode: MergeMode,
    ) -> Result<DedupOutcome, MatchError> {
        match mode {
            MergeMode::Exact => self.reduce(records),
            MergeMode::Fuzzy => self.reduce_fuzzy(records),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default(), SynonymTable::builtin())
    }
}

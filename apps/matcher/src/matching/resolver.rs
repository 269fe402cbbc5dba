//! Match Resolver — finds the best pool record for a candidate.
//!
//! Identity fields (email, phone) short-circuit name comparison entirely.
//! Otherwise every pool record is scored on display name, in natural and
//! swapped word order, and the best one is returned if it clears the threshold.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup::completeness::survivor_order;
use crate::errors::MatchError;
use crate::models::{MatchCandidate, MatchedOn, Record, RunnerUp};
use crate::normalize::normalize_words;
use crate::scoring::{SimilarityScorer, TieredScorer};

pub const LINK_THRESHOLD: f64 = 70.0;
pub const REVIEW_THRESHOLD: f64 = 50.0;
pub const DEFAULT_AMBIGUITY_EPSILON: f64 = 2.0;

const IDENTITY_SCORE: f64 = 100.0;

/// Caller-selectable threshold presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Confident enough to link records automatically.
    #[default]
    Link,
    /// Possible match worth a human review.
    Review,
}

impl MatchPolicy {
    pub fn threshold(self) -> f64 {
        match self {
            MatchPolicy::Link => LINK_THRESHOLD,
            MatchPolicy::Review => REVIEW_THRESHOLD,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────────────────────────────────────

pub struct Resolver<'s> {
    scorer: &'s dyn SimilarityScorer,
    ambiguity_epsilon: f64,
}

struct Scored<'a> {
    index: usize,
    record: &'a Record,
    score: f64,
    matched_on: MatchedOn,
}

impl<'s> Resolver<'s> {
    pub fn new(scorer: &'s dyn SimilarityScorer, ambiguity_epsilon: f64) -> Self {
        Self {
            scorer,
            ambiguity_epsilon,
        }
    }

    /// Best match for `candidate` in `pool`, or `Ok(None)` when nothing
    /// reaches `threshold`. Fails only on a threshold outside 0 – 100.
    pub fn resolve<'a>(
        &self,
        candidate: &Record,
        pool: &'a [Record],
        threshold: f64,
    ) -> Result<Option<MatchCandidate<'a>>, MatchError> {
        validate_threshold(threshold)?;

        let identity_hits = identity_matches(candidate, pool);
        let mut ranked = if identity_hits.is_empty() {
            self.name_matches(candidate, pool)
        } else {
            identity_hits
        };

        ranked.sort_by(rank_order);

        let mut iter = ranked.into_iter();
        let Some(best) = iter.next() else {
            debug!("No candidates for {:?}", candidate.display_name);
            return Ok(None);
        };
        if best.score < threshold {
            debug!(
                "Best match for {:?} is {} at {:.1}, below threshold {threshold}",
                candidate.display_name, best.record.id, best.score
            );
            return Ok(None);
        }

        let runner_up = iter
            .next()
            .filter(|second| {
                second.score >= threshold && best.score - second.score < self.ambiguity_epsilon
            })
            .map(|second| RunnerUp {
                record_id: second.record.id.clone(),
                score: second.score,
            });

        debug!(
            "Resolved {:?} → {} (score {:.1}, {:?}{})",
            candidate.display_name,
            best.record.id,
            best.score,
            best.matched_on,
            if runner_up.is_some() { ", ambiguous" } else { "" }
        );

        Ok(Some(MatchCandidate {
            record: best.record,
            score: best.score,
            matched_on: best.matched_on,
            runner_up,
        }))
    }

    /// Resolves each candidate independently; results keep input order.
    pub fn resolve_batch<'a>(
        &self,
        candidates: &[Record],
        pool: &'a [Record],
        threshold: f64,
    ) -> Result<Vec<Option<MatchCandidate<'a>>>, MatchError> {
        validate_threshold(threshold)?;
        candidates
            .iter()
            .map(|c| self.resolve(c, pool, threshold))
            .collect()
    }

    /// Name score of `candidate` against `other`: the better of natural and
    /// swapped word order.
    pub fn name_score(&self, candidate: &str, other: &str) -> (f64, MatchedOn) {
        let natural = self.scorer.score(candidate, other);
        let swapped = swap_name_order(candidate)
            .map(|s| self.scorer.score(&s, other))
            .unwrap_or(0.0);

        if swapped > natural {
            (swapped, MatchedOn::SwappedName)
        } else {
            (natural, MatchedOn::Name)
        }
    }

    fn name_matches<'a>(&self, candidate: &Record, pool: &'a [Record]) -> Vec<Scored<'a>> {
        pool.iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let (score, matched_on) =
                    self.name_score(&candidate.display_name, &record.display_name);
                (score > 0.0).then_some(Scored {
                    index,
                    record,
                    score,
                    matched_on,
                })
            })
            .collect()
    }
}

/// Resolves with the default `TieredScorer` and ambiguity window.
pub fn resolve<'a>(
    candidate: &Record,
    pool: &'a [Record],
    threshold: f64,
) -> Result<Option<MatchCandidate<'a>>, MatchError> {
    Resolver::new(&TieredScorer, DEFAULT_AMBIGUITY_EPSILON).resolve(candidate, pool, threshold)
}

/// Moves the last word to the front: `"Jean Dupont"` → `"dupont jean"`.
/// `None` for fewer than two words.
pub fn swap_name_order(name: &str) -> Option<String> {
    let words = normalize_words(name);
    let (rest, last) = words.rsplit_once(' ')?;
    Some(format!("{last} {rest}"))
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), MatchError> {
    if threshold.is_finite() && (0.0..=100.0).contains(&threshold) {
        Ok(())
    } else {
        Err(MatchError::invalid(format!(
            "threshold must be within 0..=100, got {threshold}"
        )))
    }
}

/// Email hits rank above phone hits; all identity hits score 100.
fn identity_matches<'a>(candidate: &Record, pool: &'a [Record]) -> Vec<Scored<'a>> {
    let email = candidate.usable_email();
    let phone = candidate.usable_phone();
    if email.is_none() && phone.is_none() {
        return Vec::new();
    }

    pool.iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let matched_on = if email.is_some() && record.usable_email() == email {
                MatchedOn::Email
            } else if phone.is_some() && record.usable_phone() == phone {
                MatchedOn::Phone
            } else {
                return None;
            };
            Some(Scored {
                index,
                record,
                score: IDENTITY_SCORE,
                matched_on,
            })
        })
        .collect()
}

/// Highest score first; identity kind (email before phone) next; then the
/// survivor tie-break (email present, usable phone, earliest `created_at`);
/// pool order last.
fn rank_order(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| identity_rank(a.matched_on).cmp(&identity_rank(b.matched_on)))
        .then_with(|| survivor_order(a.record, b.record))
        .then_with(|| a.index.cmp(&b.index))
}

fn identity_rank(matched_on: MatchedOn) -> u8 {
    match matched_on {
        MatchedOn::Email => 0,
        MatchedOn::Phone => 1,
        MatchedOn::Name | MatchedOn::SwappedName => 2,
    }
}

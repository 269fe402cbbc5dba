//! Similarity Scorer — pluggable, trait-based scorer over normalized strings.
//!
//! Default: `TieredScorer` (exact → containment → token overlap → trigram).
//! Scores are on a 0 – 100 scale everywhere in this crate.
//!
//! The engine holds an `Arc<dyn SimilarityScorer>`, swapped at construction.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize, normalize_words};

// ────────────────────────────────────────────────────────────────────────────
// Tier constants
// ────────────────────────────────────────────────────────────────────────────

pub const EXACT_SCORE: f64 = 100.0;
pub const CONTAINMENT_STRONG_SCORE: f64 = 90.0;
pub const CONTAINMENT_WEAK_SCORE: f64 = 80.0;
/// Contained/container length ratio at which containment counts as strong.
pub const CONTAINMENT_STRONG_RATIO: f64 = 0.7;
/// Token overlap is scaled into 0 – 70 so it never reads as containment.
pub const TOKEN_OVERLAP_SCALE: f64 = 0.7;

const TRIGRAM: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Which tier produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Containment,
    TokenOverlap,
    Trigram,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub tier: MatchTier,
}

impl ScoreBreakdown {
    fn new(score: f64, tier: MatchTier) -> Self {
        Self { score, tier }
    }

    fn no_match() -> Self {
        Self::new(0.0, MatchTier::NoMatch)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap scoring backends without touching the resolver or
/// the reducer.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of two raw strings, 0 – 100. Empty-after-normalization
    /// input must score 0.
    fn score(&self, a: &str, b: &str) -> f64;

    /// Backend label, for logs and reports.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// TieredScorer — default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Layered string similarity. The first tier that fires wins:
///
/// 1. compact keys equal → 100
/// 2. one compact key contains the other → 90, or 80 when the contained key
///    is under 70% of the container's length
/// 3. both inputs have ≥ 2 words and at least one word of the smaller set is a
///    substring of (or contains) a word of the larger → `matched / |smaller| × 70`
/// 4. trigram fallback on compact keys → `found / max(1, len(shorter) − 2) × 100`
///
/// Tiers 1 – 3 are symmetric. Tier 4 is driven by the shorter key (by the
/// first operand when lengths are equal), so it can differ with argument
/// order. Thresholds downstream are tuned against this behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct TieredScorer;

impl TieredScorer {
    pub fn explain(&self, a: &str, b: &str) -> ScoreBreakdown {
        let key_a = normalize(a);
        let key_b = normalize(b);

        if key_a.is_empty() || key_b.is_empty() {
            return ScoreBreakdown::no_match();
        }

        if key_a == key_b {
            return ScoreBreakdown::new(EXACT_SCORE, MatchTier::Exact);
        }

        if let Some(score) = containment_score(&key_a, &key_b) {
            return ScoreBreakdown::new(score, MatchTier::Containment);
        }

        let words_a = normalize_words(a);
        let words_b = normalize_words(b);
        let tokens_a: BTreeSet<&str> = words_a.split_whitespace().collect();
        let tokens_b: BTreeSet<&str> = words_b.split_whitespace().collect();

        if tokens_a.len() >= 2 && tokens_b.len() >= 2 {
            let overlap = token_overlap(&tokens_a, &tokens_b);
            if overlap > 0.0 {
                return ScoreBreakdown::new(overlap * TOKEN_OVERLAP_SCALE, MatchTier::TokenOverlap);
            }
        }

        let trigram = trigram_score(&key_a, &key_b);
        if trigram > 0.0 {
            ScoreBreakdown::new(trigram, MatchTier::Trigram)
        } else {
            ScoreBreakdown::no_match()
        }
    }
}

impl SimilarityScorer for TieredScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        self.explain(a, b).score
    }

    fn backend(&self) -> &'static str {
        "tiered"
    }
}

/// Similarity with the default `TieredScorer`.
pub fn similarity(a: &str, b: &str) -> f64 {
    TieredScorer.score(a, b)
}

// ────────────────────────────────────────────────────────────────────────────
// Tier implementations
// ────────────────────────────────────────────────────────────────────────────

fn containment_score(a: &str, b: &str) -> Option<f64> {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if !longer.contains(shorter) {
        return None;
    }
    // keys are ASCII, byte length == char count
    let ratio = shorter.len() as f64 / longer.len() as f64;
    if ratio >= CONTAINMENT_STRONG_RATIO {
        Some(CONTAINMENT_STRONG_SCORE)
    } else {
        Some(CONTAINMENT_WEAK_SCORE)
    }
}

/// Percentage of the smaller word set matched against the larger one. With
/// equal cardinality both directions are counted and the larger kept.
fn token_overlap(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    match a.len().cmp(&b.len()) {
        Ordering::Less => directional_overlap(a, b),
        Ordering::Greater => directional_overlap(b, a),
        Ordering::Equal => directional_overlap(a, b).max(directional_overlap(b, a)),
    }
}

fn directional_overlap(from: &BTreeSet<&str>, to: &BTreeSet<&str>) -> f64 {
    if from.is_empty() {
        return 0.0;
    }
    let matched = from
        .iter()
        .filter(|&&w| to.iter().any(|&o| o.contains(w) || w.contains(o)))
        .count();
    matched as f64 / from.len() as f64 * 100.0
}

fn trigram_score(a: &str, b: &str) -> f64 {
    let (shorter, longer) = if b.len() < a.len() { (b, a) } else { (a, b) };
    let windows = shorter.len().saturating_sub(TRIGRAM - 1);
    if windows == 0 {
        return 0.0;
    }
    let found = (0..windows)
        .filter(|&i| longer.contains(&shorter[i..i + TRIGRAM]))
        .count();
    found as f64 / windows.max(1) as f64 * 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

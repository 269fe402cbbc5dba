// Similarity Scorer
// 0 – 100 string similarity over normalized forms. Backends implement
// `SimilarityScorer`; `TieredScorer` is the default.

pub mod similarity;

pub use similarity::{similarity, MatchTier, ScoreBreakdown, SimilarityScorer, TieredScorer};

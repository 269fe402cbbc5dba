//! Candidate / prospect record matching and deduplication.
//!
//! Pure, synchronous and side-effect free: callers own storage and transport.
//! [`Matcher`] bundles the policy; the free functions below use the defaults.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod scoring;

pub use config::{MatchConfig, MergeMode};
pub use dedup::{reduce, reduce_fuzzy};
pub use engine::Matcher;
pub use errors::MatchError;
pub use matching::{resolve, MatchPolicy};
pub use models::{parse_records, DedupOutcome, MatchCandidate, MatchedOn, MergeConflict, Record};
pub use normalize::{fix_typos, normalize, normalize_email, normalize_phone, SynonymTable};
pub use scoring::{similarity, SimilarityScorer, TieredScorer};

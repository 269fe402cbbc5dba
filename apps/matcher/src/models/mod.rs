pub mod dedup;
pub mod matching;
pub mod record;

pub use dedup::{ConflictSeverity, DedupOutcome, MergeConflict};
pub use matching::{MatchCandidate, MatchedOn, RunnerUp};
pub use record::{parse_records, Record};

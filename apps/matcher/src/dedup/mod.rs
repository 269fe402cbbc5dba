// Dedup Reducer
// Survivor ranking, fill-missing merge, and exact / fuzzy group reduction.

pub mod completeness;
pub mod merge;
pub mod reducer;

pub use completeness::{
    completeness_score, compute_contact_coverage, survivor_order, ContactCoverage,
};
pub use merge::merge_group;
pub use reducer::{reduce, reduce_fuzzy, reduce_fuzzy_with, superseded_index};

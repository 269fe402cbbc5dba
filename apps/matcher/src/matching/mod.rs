// Match Resolver
// Best pool record for a candidate: identity short-circuit, then name score
// in natural and swapped order against a caller-chosen threshold.

pub mod resolver;

pub use resolver::{
    resolve, swap_name_order, MatchPolicy, Resolver, DEFAULT_AMBIGUITY_EPSILON, LINK_THRESHOLD,
    REVIEW_THRESHOLD,
};

//! Dedup Reducer — collapses duplicate records into one survivor per group.
//!
//! `reduce` groups on the exact normalized name key. `reduce_fuzzy` starts
//! from those groups and links them further on shared identity fields or
//! name similarity. Both hand each group to `merge_group` after ordering it
//! with `survivor_order`.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::dedup::completeness::survivor_order;
use crate::dedup::merge::merge_group;
use crate::errors::MatchError;
use crate::matching::resolver::{validate_threshold, Resolver, DEFAULT_AMBIGUITY_EPSILON};
use crate::models::{DedupOutcome, Record};
use crate::scoring::{SimilarityScorer, TieredScorer};

/// Exact-key reduction. Records whose name normalizes to nothing are never
/// grouped. Output order follows each group's first appearance in `records`.
pub fn reduce(records: Vec<Record>) -> Result<DedupOutcome, MatchError> {
    ensure_unique_ids(&records)?;

    let input_count = records.len();
    let groups = exact_groups(&records);
    let outcome = merge_groups(records, groups);

    log_summary("exact", input_count, &outcome);
    Ok(outcome)
}

/// Fuzzy reduction with the default `TieredScorer`.
pub fn reduce_fuzzy(records: Vec<Record>, threshold: f64) -> Result<DedupOutcome, MatchError> {
    reduce_fuzzy_with(records, threshold, &TieredScorer)
}

/// Exact-key groups, then transitively linked: two groups join when any pair
/// of their members shares a usable email or phone, or scores at least
/// `threshold` on name in either operand order.
///
/// Linking on any member pair keeps a second pass over the output a no-op:
/// every merged field comes from some member, so any link between two merged
/// records already existed between two of their members.
pub fn reduce_fuzzy_with(
    records: Vec<Record>,
    threshold: f64,
    scorer: &dyn SimilarityScorer,
) -> Result<DedupOutcome, MatchError> {
    validate_threshold(threshold)?;
    ensure_unique_ids(&records)?;

    let input_count = records.len();
    let exact = exact_groups(&records);
    let resolver = Resolver::new(scorer, DEFAULT_AMBIGUITY_EPSILON);

    let mut sets = DisjointSet::new(exact.len());
    for i in 0..exact.len() {
        for j in (i + 1)..exact.len() {
            if sets.find(i) == sets.find(j) {
                continue;
            }
            if groups_link(&records, &exact[i], &exact[j], &resolver, threshold) {
                debug!(
                    "Linking {} and {}",
                    records[exact[i][0]].id, records[exact[j][0]].id
                );
                sets.union(i, j);
            }
        }
    }

    let mut by_root: Vec<Vec<usize>> = Vec::new();
    let mut root_slot: HashMap<usize, usize> = HashMap::new();
    for (i, group) in exact.into_iter().enumerate() {
        let root = sets.find(i);
        let slot = *root_slot.entry(root).or_insert_with(|| {
            by_root.push(Vec::new());
            by_root.len() - 1
        });
        by_root[slot].extend(group);
    }
    for group in &mut by_root {
        group.sort_unstable();
    }

    let outcome = merge_groups(records, by_root);
    log_summary("fuzzy", input_count, &outcome);
    Ok(outcome)
}

// ────────────────────────────────────────────────────────────────────────────
// Grouping
// ────────────────────────────────────────────────────────────────────────────

fn ensure_unique_ids(records: &[Record]) -> Result<(), MatchError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(MatchError::invalid(format!(
                "duplicate record id {:?}",
                record.id
            )));
        }
    }
    Ok(())
}

/// Indices into `records`, one vec per normalized name key, in first-seen order.
fn exact_groups(records: &[Record]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        let key = record.name_key();
        if key.is_empty() {
            groups.push(vec![i]);
            continue;
        }
        match by_key.get(&key) {
            Some(&slot) => groups[slot].push(i),
            None => {
                by_key.insert(key, groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

fn groups_link(
    records: &[Record],
    left: &[usize],
    right: &[usize],
    resolver: &Resolver<'_>,
    threshold: f64,
) -> bool {
    left.iter().any(|&a| {
        right
            .iter()
            .any(|&b| records_link(&records[a], &records[b], resolver, threshold))
    })
}

fn records_link(a: &Record, b: &Record, resolver: &Resolver<'_>, threshold: f64) -> bool {
    if a.usable_email().is_some_and(|e| b.usable_email().as_ref() == Some(&e)) {
        return true;
    }
    if a.usable_phone().is_some_and(|p| b.usable_phone().as_ref() == Some(&p)) {
        return true;
    }
    let (forward, _) = resolver.name_score(&a.display_name, &b.display_name);
    let (backward, _) = resolver.name_score(&b.display_name, &a.display_name);
    forward.max(backward) >= threshold
}

/// Orders each group by survivor rank and folds it into its first member.
fn merge_groups(records: Vec<Record>, groups: Vec<Vec<usize>>) -> DedupOutcome {
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let mut outcome = DedupOutcome::default();

    for group in groups {
        let mut members: Vec<Record> = group.iter().filter_map(|&i| slots[i].take()).collect();
        // stable: input order breaks full ties
        members.sort_by(survivor_order);

        let mut members = members.into_iter();
        let Some(kept) = members.next() else {
            continue;
        };
        let superseded: Vec<Record> = members.collect();
        if superseded.is_empty() {
            outcome.merged.push(kept);
            continue;
        }

        let superseded_ids = superseded.iter().map(|r| r.id.clone()).collect();
        let merged = merge_group(kept, &superseded, &mut outcome.conflicts);
        outcome.superseded_ids.insert(merged.id.clone(), superseded_ids);
        outcome.merged.push(merged);
    }

    outcome
}

fn log_summary(mode: &str, input_count: usize, outcome: &DedupOutcome) {
    info!(
        "Reduced {input_count} records to {} ({mode}): {} superseded, {} conflicts",
        outcome.merged.len(),
        outcome.superseded_count(),
        outcome.conflicts.len()
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Union-find over exact-key groups
// ────────────────────────────────────────────────────────────────────────────

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// The lower index becomes the root so output order stays first-seen.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        match ra.cmp(&rb) {
            std::cmp::Ordering::Less => self.parent[rb] = ra,
            std::cmp::Ordering::Greater => self.parent[ra] = rb,
            std::cmp::Ordering::Equal => {}
        }
    }
}

/// Kept id for every input id that was folded away, flattened.
pub fn superseded_index(outcome: &DedupOutcome) -> BTreeMap<&str, &str> {
    outcome
        .superseded_ids
        .iter()
        .flat_map(|(kept, ids)| ids.iter().map(move |id| (id.as_str(), kept.as_str())))
        .collect()
}

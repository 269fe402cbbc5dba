use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Advisory,
    Warning,
}

/// A populated kept field that disagreed with a superseded record's value.
/// The superseded value was discarded (never-overwrite); this is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    pub kept_id: String,
    pub superseded_id: String,
    pub field: String,
    pub kept_value: String,
    pub discarded_value: String,
    pub severity: ConflictSeverity,
}

/// Output of one reduction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupOutcome {
    pub merged: Vec<Record>,
    /// kept id → ids of the records folded into it. Callers re-point foreign
    /// references from each superseded id to the kept id before deleting.
    pub superseded_ids: BTreeMap<String, Vec<String>>,
    pub conflicts: Vec<MergeConflict>,
}

impl DedupOutcome {
    pub fn superseded_count(&self) -> usize {
        self.superseded_ids.values().map(Vec::len).sum()
    }

    /// Kept id that replaces `superseded_id`, if it was superseded.
    pub fn kept_id_for(&self, superseded_id: &str) -> Option<&str> {
        self.superseded_ids
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| id == superseded_id))
            .map(|(kept, _)| kept.as_str())
    }
}

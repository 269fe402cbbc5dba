use serde::{Deserialize, Serialize};

use crate::models::record::Record;

/// Which signal produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedOn {
    Email,
    Phone,
    Name,
    /// Name matched once the candidate's last word was moved to the front.
    SwappedName,
}

impl MatchedOn {
    pub fn is_identity(self) -> bool {
        matches!(self, MatchedOn::Email | MatchedOn::Phone)
    }
}

/// Second-best pool record, close enough to the winner to deserve a human look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerUp {
    pub record_id: String,
    pub score: f64,
}

/// Result of one resolution call. Borrows the winning pool record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate<'a> {
    pub record: &'a Record,
    pub score: f64,
    pub matched_on: MatchedOn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<RunnerUp>,
}

impl MatchCandidate<'_> {
    /// True when a runner-up scored within the ambiguity window.
    pub fn needs_review(&self) -> bool {
        self.runner_up.is_some()
    }
}

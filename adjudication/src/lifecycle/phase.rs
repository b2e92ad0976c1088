//! Match phases derived from a scoring record.

use serde::{Deserialize, Serialize};

use crate::state::MatchScoringRecord;

/// Where a match is in its scoring lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No scorecards yet.
    Open,
    /// Some scorecards are in, or all three are in but the match could not
    /// be finalized yet (tie, failed upstream report).
    Collecting,
    /// Result computed and reported; read-only until reopened upstream.
    Finalized,
}

impl MatchPhase {
    pub fn of(record: &MatchScoringRecord) -> Self {
        Self::from_counts(record.judge_count(), record.finalized)
    }

    pub fn from_counts(judge_count: usize, finalized: bool) -> Self {
        if finalized {
            Self::Finalized
        } else if judge_count == 0 {
            Self::Open
        } else {
            Self::Collecting
        }
    }

    /// Whether this is a terminal phase (only an external reopen leaves it).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// Whether judges may still submit or delete scorecards.
    pub fn accepts_scorecards(self) -> bool {
        !self.is_terminal()
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [MatchPhase] {
        match self {
            Self::Open => &[Self::Collecting],
            Self::Collecting => &[Self::Collecting, Self::Open, Self::Finalized],
            Self::Finalized => &[Self::Open],
        }
    }

    pub fn can_transition_to(self, next: MatchPhase) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Collecting => write!(f, "collecting"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_counts() {
        assert_eq!(MatchPhase::from_counts(0, false), MatchPhase::Open);
        assert_eq!(MatchPhase::from_counts(2, false), MatchPhase::Collecting);
        assert_eq!(MatchPhase::from_counts(3, false), MatchPhase::Collecting);
        assert_eq!(MatchPhase::from_counts(3, true), MatchPhase::Finalized);
    }

    #[test]
    fn test_transitions() {
        assert!(MatchPhase::Open.can_transition_to(MatchPhase::Collecting));
        assert!(!MatchPhase::Open.can_transition_to(MatchPhase::Finalized));
        assert!(MatchPhase::Collecting.can_transition_to(MatchPhase::Open));
        assert!(MatchPhase::Collecting.can_transition_to(MatchPhase::Finalized));
        assert!(!MatchPhase::Finalized.can_transition_to(MatchPhase::Collecting));
        assert!(MatchPhase::Finalized.can_transition_to(MatchPhase::Open));

        assert!(MatchPhase::Finalized.is_terminal());
        assert!(!MatchPhase::Finalized.accepts_scorecards());
        assert!(MatchPhase::Collecting.accepts_scorecards());
    }
}

//! Error types for the match lifecycle

use crate::reporting::ReportError;
use crate::state::{CompetitorRef, MatchId, ParseJudgeSeatError, StoreError, TournamentId};

/// A scorecard submission that cannot be accepted as sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error(transparent)]
    UnknownJudge(#[from] ParseJudgeSeatError),

    #[error("competitor A and competitor B must be different")]
    SameCompetitors,

    #[error("scores are required unless isKO is set")]
    MissingScores,

    #[error("isKO requires koWinnerId")]
    MissingKoWinner,

    #[error("KO winner {0} is not a competitor in this match")]
    KoWinnerNotInMatch(CompetitorRef),

    #[error("missing score for criterion {0}")]
    MissingCriterion(String),

    #[error("unknown criterion {0}")]
    UnknownCriterion(String),

    #[error("score {share} for {criterion} is outside 0-{points}")]
    ShareOutOfRange {
        criterion: String,
        share: i64,
        points: u32,
    },

    #[error("match {match_id} is between {recorded_a} and {recorded_b}, not {submitted_a} and {submitted_b}")]
    CompetitorMismatch {
        match_id: MatchId,
        recorded_a: CompetitorRef,
        recorded_b: CompetitorRef,
        submitted_a: CompetitorRef,
        submitted_b: CompetitorRef,
    },

    #[error("match {match_id} belongs to tournament {recorded}, not {submitted}")]
    TournamentMismatch {
        match_id: MatchId,
        recorded: TournamentId,
        submitted: TournamentId,
    },
}

/// Error type for lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum AdjudicationError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("Match {match_id} is already finalized")]
    AlreadyFinalized { match_id: MatchId },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Match {match_id} has not been finalized")]
    NotFinalized { match_id: MatchId },

    #[error("Match {match_id} has {judge_count} of 3 scorecards")]
    NotReady { match_id: MatchId, judge_count: usize },

    #[error("Match {match_id} is tied {score_a}-{score_b} on points")]
    TiedMatch {
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
    },

    #[error("Bracket host report failed: {0}")]
    UpstreamReport(#[from] ReportError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AdjudicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyFinalized(match_id) => AdjudicationError::AlreadyFinalized { match_id },
            StoreError::NotFound(what) => AdjudicationError::NotFound(what),
            other => AdjudicationError::Store(other),
        }
    }
}

impl AdjudicationError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AdjudicationError::Validation(_) => "VALIDATION_ERROR",
            AdjudicationError::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            AdjudicationError::NotFound(_) => "NOT_FOUND",
            AdjudicationError::NotFinalized { .. } => "NOT_FINALIZED",
            AdjudicationError::NotReady { .. } => "NOT_READY",
            AdjudicationError::TiedMatch { .. } => "TIED_MATCH",
            AdjudicationError::UpstreamReport(_) => "UPSTREAM_REPORT_FAILED",
            AdjudicationError::Store(_) => "STORE_FAILURE",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            AdjudicationError::UpstreamReport(err) => err.is_retryable(),
            AdjudicationError::Store(_) => true,
            _ => false,
        }
    }
}

/// Result type for lifecycle operations
pub type AdjudicationResult<T> = Result<T, AdjudicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_lifecycle_variants() {
        let err: AdjudicationError = StoreError::AlreadyFinalized("m1".into()).into();
        assert!(matches!(err, AdjudicationError::AlreadyFinalized { ref match_id } if match_id == "m1"));
        assert_eq!(err.code(), "ALREADY_FINALIZED");

        let err: AdjudicationError = StoreError::NotFound("m2".into()).into();
        assert_eq!(err.code(), "NOT_FOUND");

        let err: AdjudicationError = StoreError::Backend("disk full".into()).into();
        assert_eq!(err.code(), "STORE_FAILURE");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_follows_report_error() {
        let err = AdjudicationError::from(ReportError::Transport("reset".into()));
        assert!(err.is_retryable());

        let err = AdjudicationError::from(ReportError::Rejected {
            status: 422,
            body: String::new(),
        });
        assert!(!err.is_retryable());
        assert!(!AdjudicationError::from(ValidationError::SameCompetitors).is_retryable());
    }
}

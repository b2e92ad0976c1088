//! Event types for match scoring
//!
//! Published by the lifecycle controller at every state change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{CompetitorRef, JudgeSeat, MatchId, TournamentId, WinMethod};

/// All match scoring events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringEvent {
    /// A judge's scorecard was stored (new or replacing a prior one)
    ScorecardSubmitted {
        match_id: MatchId,
        tournament_id: TournamentId,
        judge: JudgeSeat,
        knockout: bool,
        replaced: bool,
        judge_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A judge's scorecard was removed before finalization
    ScorecardDeleted {
        match_id: MatchId,
        judge: JudgeSeat,
        judge_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The match was decided and reported upstream
    MatchFinalized {
        match_id: MatchId,
        tournament_id: TournamentId,
        winner: CompetitorRef,
        win_method: WinMethod,
        scores_csv: String,
        timestamp: DateTime<Utc>,
    },

    /// Reporting a decided match upstream failed; the match stays open
    ReportFailed {
        match_id: MatchId,
        tournament_id: TournamentId,
        error: String,
        retryable: bool,
        timestamp: DateTime<Utc>,
    },

    /// All three scorecards are in but the points are level
    TieDetected {
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
        timestamp: DateTime<Utc>,
    },

    /// A decided match was reopened for re-scoring
    MatchReopened {
        match_id: MatchId,
        tournament_id: TournamentId,
        timestamp: DateTime<Utc>,
    },
}

impl ScoringEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ScoringEvent::ScorecardSubmitted { timestamp, .. } => *timestamp,
            ScoringEvent::ScorecardDeleted { timestamp, .. } => *timestamp,
            ScoringEvent::MatchFinalized { timestamp, .. } => *timestamp,
            ScoringEvent::ReportFailed { timestamp, .. } => *timestamp,
            ScoringEvent::TieDetected { timestamp, .. } => *timestamp,
            ScoringEvent::MatchReopened { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ScoringEvent::ScorecardSubmitted { .. } => "scorecard_submitted",
            ScoringEvent::ScorecardDeleted { .. } => "scorecard_deleted",
            ScoringEvent::MatchFinalized { .. } => "match_finalized",
            ScoringEvent::ReportFailed { .. } => "report_failed",
            ScoringEvent::TieDetected { .. } => "tie_detected",
            ScoringEvent::MatchReopened { .. } => "match_reopened",
        }
    }

    /// The match this event concerns
    pub fn match_id(&self) -> &str {
        match self {
            ScoringEvent::ScorecardSubmitted { match_id, .. }
            | ScoringEvent::ScorecardDeleted { match_id, .. }
            | ScoringEvent::MatchFinalized { match_id, .. }
            | ScoringEvent::ReportFailed { match_id, .. }
            | ScoringEvent::TieDetected { match_id, .. }
            | ScoringEvent::MatchReopened { match_id, .. } => match_id,
        }
    }
}

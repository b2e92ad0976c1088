//! Match lifecycle controller
//!
//! Accepts scorecards, resolves matches when the third one arrives, reports
//! results to the bracket host and finalizes each match exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::error::{AdjudicationError, AdjudicationResult, ValidationError};
use super::locks::MatchLocks;
use super::phase::MatchPhase;
use super::submission::ScorecardSubmission;
use crate::events::{ScoringEvent, SharedEventBus};
use crate::reporting::{score_csv, SharedBracketReporter};
use crate::scoring::{
    resolve, scorecard_totals, split_breakdown, CriterionSplit, Resolution, ResolveError,
    ScoringConfig,
};
use crate::state::{
    CompetitorRef, Competitors, ExternalReceipt, JudgeSeat, MatchId, MatchResult,
    MatchScoringRecord, SharedScorecardStore, TournamentId,
};

/// Shared reference to a controller
pub type SharedMatchController = Arc<MatchController>;

/// What a scorecard submission led to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// True only for the submission that finalized the match
    pub finalized: bool,
    pub judge_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

/// Progress summary of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub match_id: MatchId,
    pub judge_count: usize,
    pub finalized: bool,
    pub phase: MatchPhase,
    /// Judge seats that have a scorecard on file
    pub judges: Vec<JudgeSeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

impl MatchStatus {
    /// Status of a match nobody has scored yet
    pub fn empty(match_id: impl Into<MatchId>) -> Self {
        Self {
            match_id: match_id.into(),
            judge_count: 0,
            finalized: false,
            phase: MatchPhase::Open,
            judges: Vec::new(),
            result: None,
        }
    }

    pub fn of(record: &MatchScoringRecord) -> Self {
        Self {
            match_id: record.match_id.clone(),
            judge_count: record.judge_count(),
            finalized: record.finalized,
            phase: MatchPhase::of(record),
            judges: record.scorecards.keys().copied().collect(),
            result: record.result.clone(),
        }
    }
}

/// One judge's scorecard expanded for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeBreakdown {
    pub judge: JudgeSeat,
    pub submitted_at: DateTime<Utc>,
    pub knockout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ko_winner: Option<CompetitorRef>,
    /// Per-criterion split, empty for knockouts
    pub criteria: Vec<CriterionSplit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_b: Option<u32>,
}

/// Full scoring detail of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub status: MatchStatus,
    pub tournament_id: TournamentId,
    pub competitors: Competitors,
    pub scorecards: Vec<JudgeBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ExternalReceipt>,
}

/// Drives matches from first scorecard to reported result
///
/// Every mutating operation runs under the match's lock, from loading the
/// record to writing it back, so two requests for the same match never
/// interleave and the finalizing transition happens once.
pub struct MatchController {
    store: SharedScorecardStore,
    reporter: SharedBracketReporter,
    event_bus: SharedEventBus,
    config: ScoringConfig,
    locks: MatchLocks,
}

impl MatchController {
    pub fn new(
        store: SharedScorecardStore,
        reporter: SharedBracketReporter,
        event_bus: SharedEventBus,
        config: ScoringConfig,
    ) -> Self {
        info!(
            store = store.backend_name(),
            reporter = reporter.name(),
            criteria = config.criteria.len(),
            point_budget = config.point_budget(),
            "Match controller ready"
        );
        Self {
            store,
            reporter,
            event_bus,
            config,
            locks: MatchLocks::new(),
        }
    }

    pub fn shared(self) -> SharedMatchController {
        Arc::new(self)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.event_bus
    }

    // =========================================================================
    // Scorecards
    // =========================================================================

    /// Store a judge's scorecard and finalize the match if it is the third
    ///
    /// A resubmission from the same judge replaces the earlier card. Only
    /// the call that completes the panel and gets the result accepted
    /// upstream returns `finalized: true`.
    pub async fn submit_scorecard(
        &self,
        submission: ScorecardSubmission,
    ) -> AdjudicationResult<SubmitOutcome> {
        submission.validate(&self.config)?;
        let _guard = self.locks.acquire(&submission.match_id).await;

        let ScorecardSubmission {
            match_id,
            tournament_id,
            judge,
            competitors,
            scorecard,
        } = submission;

        let existing = self.store.get(&match_id).await?;
        let mut record = match existing {
            Some(record) if !MatchPhase::of(&record).accepts_scorecards() => {
                debug!(match_id = %match_id, judge = %judge, "Rejected scorecard for finalized match");
                return Err(AdjudicationError::AlreadyFinalized { match_id });
            }
            Some(record) => {
                if record.tournament_id != tournament_id {
                    return Err(ValidationError::TournamentMismatch {
                        match_id,
                        recorded: record.tournament_id,
                        submitted: tournament_id,
                    }
                    .into());
                }
                if record.competitors != competitors {
                    return Err(ValidationError::CompetitorMismatch {
                        match_id,
                        recorded_a: record.competitors.a,
                        recorded_b: record.competitors.b,
                        submitted_a: competitors.a,
                        submitted_b: competitors.b,
                    }
                    .into());
                }
                record
            }
            None => MatchScoringRecord::new(match_id.clone(), tournament_id, competitors),
        };

        let knockout = scorecard.is_knockout();
        let replaced = record.upsert_scorecard(judge, scorecard).is_some();
        self.store.put(&match_id, &record).await?;

        info!(
            match_id = %match_id,
            judge = %judge,
            knockout,
            replaced,
            judge_count = record.judge_count(),
            "Scorecard stored"
        );
        self.event_bus.publish(ScoringEvent::ScorecardSubmitted {
            match_id: match_id.clone(),
            tournament_id: record.tournament_id.clone(),
            judge,
            knockout,
            replaced,
            judge_count: record.judge_count(),
            timestamp: Utc::now(),
        });

        self.resolve_and_finalize(record).await
    }

    /// Remove a judge's scorecard from an unfinalized match
    pub async fn delete_scorecard(
        &self,
        match_id: &str,
        judge: JudgeSeat,
    ) -> AdjudicationResult<MatchStatus> {
        let _guard = self.locks.acquire(match_id).await;

        let record = self.store.delete_judge_scorecard(match_id, judge).await?;

        info!(match_id, judge = %judge, judge_count = record.judge_count(), "Scorecard deleted");
        self.event_bus.publish(ScoringEvent::ScorecardDeleted {
            match_id: match_id.to_string(),
            judge,
            judge_count: record.judge_count(),
            timestamp: Utc::now(),
        });

        Ok(MatchStatus::of(&record))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Judge count, finalized flag and result; empty for unknown matches
    pub async fn get_status(&self, match_id: &str) -> AdjudicationResult<MatchStatus> {
        Ok(self
            .store
            .get(match_id)
            .await?
            .map(|record| MatchStatus::of(&record))
            .unwrap_or_else(|| MatchStatus::empty(match_id)))
    }

    /// Every scorecard of a match with per-criterion splits and totals
    pub async fn get_detail(&self, match_id: &str) -> AdjudicationResult<MatchDetail> {
        let record = self
            .store
            .get(match_id)
            .await?
            .ok_or_else(|| AdjudicationError::NotFound(format!("no scorecards for match {}", match_id)))?;

        let scorecards = record
            .scorecards
            .iter()
            .map(|(judge, entry)| {
                let totals = scorecard_totals(&entry.scorecard, &self.config);
                JudgeBreakdown {
                    judge: *judge,
                    submitted_at: entry.submitted_at,
                    knockout: entry.scorecard.is_knockout(),
                    ko_winner: entry.scorecard.ko_winner().cloned(),
                    criteria: split_breakdown(&entry.scorecard, &self.config).unwrap_or_default(),
                    total_a: totals.map(|(a, _)| a),
                    total_b: totals.map(|(_, b)| b),
                }
            })
            .collect();

        Ok(MatchDetail {
            status: MatchStatus::of(&record),
            tournament_id: record.tournament_id.clone(),
            competitors: record.competitors.clone(),
            scorecards,
            receipt: record.receipt.clone(),
        })
    }

    /// Status of every scored match in a tournament
    pub async fn list_tournament(&self, tournament_id: &str) -> AdjudicationResult<Vec<MatchStatus>> {
        let records = self.store.list(tournament_id).await?;
        Ok(records.iter().map(MatchStatus::of).collect())
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Re-run resolution and reporting for a complete, unfinalized match
    ///
    /// Used after the bracket host was unreachable when the third
    /// scorecard arrived.
    pub async fn retry_report(&self, match_id: &str) -> AdjudicationResult<SubmitOutcome> {
        let _guard = self.locks.acquire(match_id).await;

        let record = self
            .store
            .get(match_id)
            .await?
            .ok_or_else(|| AdjudicationError::NotFound(format!("no scorecards for match {}", match_id)))?;

        if record.finalized {
            return Err(AdjudicationError::AlreadyFinalized {
                match_id: record.match_id,
            });
        }
        let judge_count = record.judge_count();
        if judge_count < JudgeSeat::PANEL_SIZE {
            return Err(AdjudicationError::NotReady {
                match_id: record.match_id,
                judge_count,
            });
        }

        info!(match_id, "Retrying result report");
        self.resolve_and_finalize(record).await
    }

    /// Reopen a finalized match upstream and clear it for re-scoring
    pub async fn reopen_match(&self, match_id: &str) -> AdjudicationResult<MatchStatus> {
        let _guard = self.locks.acquire(match_id).await;

        let mut record = self
            .store
            .get(match_id)
            .await?
            .ok_or_else(|| AdjudicationError::NotFound(format!("no scorecards for match {}", match_id)))?;

        if !MatchPhase::of(&record).is_terminal() {
            return Err(AdjudicationError::NotFinalized {
                match_id: record.match_id,
            });
        }

        self.reporter
            .reopen_match(&record.tournament_id, &record.match_id)
            .await
            .inspect_err(|e| warn!(match_id, error = %e, "Bracket host refused reopen"))?;

        record.reopen();
        self.store.put(match_id, &record).await?;

        info!(match_id, tournament_id = %record.tournament_id, "Match reopened");
        self.event_bus.publish(ScoringEvent::MatchReopened {
            match_id: record.match_id.clone(),
            tournament_id: record.tournament_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(MatchStatus::of(&record))
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Resolve a stored record and, when decided, report and finalize it
    ///
    /// Caller must hold the match lock.
    async fn resolve_and_finalize(
        &self,
        record: MatchScoringRecord,
    ) -> AdjudicationResult<SubmitOutcome> {
        let resolution = resolve(record.scorecards(), &record.competitors, &self.config);

        match resolution {
            Ok(Resolution::Pending { judge_count }) => Ok(SubmitOutcome {
                finalized: false,
                judge_count,
                result: None,
            }),
            Ok(Resolution::Decided(result)) => self.finalize(record, result).await,
            Err(ResolveError::Tied {
                score_a, score_b, ..
            }) => {
                warn!(match_id = %record.match_id, score_a, score_b, "Points tie, match left open");
                self.event_bus.publish(ScoringEvent::TieDetected {
                    match_id: record.match_id.clone(),
                    score_a,
                    score_b,
                    timestamp: Utc::now(),
                });
                Err(AdjudicationError::TiedMatch {
                    match_id: record.match_id,
                    score_a,
                    score_b,
                })
            }
        }
    }

    async fn finalize(
        &self,
        mut record: MatchScoringRecord,
        result: MatchResult,
    ) -> AdjudicationResult<SubmitOutcome> {
        let receipt = match self
            .reporter
            .report_result(
                &record.tournament_id,
                &record.match_id,
                &result.winner,
                result.score_a,
                result.score_b,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    match_id = %record.match_id,
                    reporter = self.reporter.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Result report failed, match stays unfinalized"
                );
                self.event_bus.publish(ScoringEvent::ReportFailed {
                    match_id: record.match_id.clone(),
                    tournament_id: record.tournament_id.clone(),
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                    timestamp: Utc::now(),
                });
                return Err(e.into());
            }
        };

        debug_assert!(MatchPhase::of(&record).can_transition_to(MatchPhase::Finalized));
        record.finalize(result.clone(), receipt);
        if let Err(e) = self.store.put(&record.match_id, &record).await {
            error!(
                match_id = %record.match_id,
                error = %e,
                "Result reported upstream but the finalized record was not stored"
            );
            return Err(e.into());
        }

        let scores = score_csv(result.score_a, result.score_b);
        info!(
            match_id = %record.match_id,
            winner = %result.winner,
            win_method = %result.win_method,
            scores = %scores,
            "Match finalized"
        );
        self.event_bus.publish(ScoringEvent::MatchFinalized {
            match_id: record.match_id.clone(),
            tournament_id: record.tournament_id.clone(),
            winner: result.winner.clone(),
            win_method: result.win_method,
            scores_csv: scores,
            timestamp: Utc::now(),
        });

        Ok(SubmitOutcome {
            finalized: true,
            judge_count: record.judge_count(),
            result: Some(result),
        })
    }
}

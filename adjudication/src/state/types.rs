//! Core types for match scoring state
//!
//! These types are persisted by every store backend and represent one
//! match's judge scorecards plus its computed, reported result.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a match, issued by the bracket host
pub type MatchId = String;

/// Identifier of a tournament/bracket, issued by the bracket host
pub type TournamentId = String;

/// Opaque competitor identifier, issued by the bracket host
pub type CompetitorRef = String;

/// Identifier of a scoring criterion (e.g. `damage`)
pub type CriterionId = String;

/// One of the two sides of a match, in host-assigned order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

/// The two competitors of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitors {
    pub a: CompetitorRef,
    pub b: CompetitorRef,
}

impl Competitors {
    pub fn new(a: impl Into<CompetitorRef>, b: impl Into<CompetitorRef>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Which side a competitor reference names, if any
    pub fn side_of(&self, competitor: &str) -> Option<Side> {
        if competitor == self.a {
            Some(Side::A)
        } else if competitor == self.b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn get(&self, side: Side) -> &CompetitorRef {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

/// Error returned when a judge identifier is not one of the fixed seats
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized judge id: {0}")]
pub struct ParseJudgeSeatError(pub String);

/// The three fixed judge roles of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JudgeSeat {
    #[serde(rename = "judge_1")]
    Judge1,
    #[serde(rename = "judge_2")]
    Judge2,
    #[serde(rename = "judge_3")]
    Judge3,
}

impl JudgeSeat {
    /// Number of judges that must submit before a match can be decided
    pub const PANEL_SIZE: usize = 3;

    pub fn all() -> &'static [JudgeSeat] {
        &[JudgeSeat::Judge1, JudgeSeat::Judge2, JudgeSeat::Judge3]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeSeat::Judge1 => "judge_1",
            JudgeSeat::Judge2 => "judge_2",
            JudgeSeat::Judge3 => "judge_3",
        }
    }
}

impl std::fmt::Display for JudgeSeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JudgeSeat {
    type Err = ParseJudgeSeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "judge_1" => Ok(JudgeSeat::Judge1),
            "judge_2" => Ok(JudgeSeat::Judge2),
            "judge_3" => Ok(JudgeSeat::Judge3),
            other => Err(ParseJudgeSeatError(other.to_string())),
        }
    }
}

/// A single judge's verdict for a match
///
/// A point split stores only competitor A's share of each criterion; B's
/// share is always derived as `criterion points - A share`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scorecard {
    /// Per-criterion share awarded to competitor A
    PointSplit { shares: BTreeMap<CriterionId, u32> },
    /// Knockout declared for the named competitor
    Knockout { winner: CompetitorRef },
}

impl Scorecard {
    pub fn is_knockout(&self) -> bool {
        matches!(self, Scorecard::Knockout { .. })
    }

    pub fn ko_winner(&self) -> Option<&CompetitorRef> {
        match self {
            Scorecard::Knockout { winner } => Some(winner),
            Scorecard::PointSplit { .. } => None,
        }
    }

    /// Competitor A's share of a criterion, if this is a point split
    pub fn share_a(&self, criterion: &str) -> Option<u32> {
        match self {
            Scorecard::PointSplit { shares } => shares.get(criterion).copied(),
            Scorecard::Knockout { .. } => None,
        }
    }
}

/// A stored scorecard plus when it was (last) submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeEntry {
    pub scorecard: Scorecard,
    pub submitted_at: DateTime<Utc>,
}

/// How a match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinMethod {
    Ko,
    Points,
}

impl std::fmt::Display for WinMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WinMethod::Ko => write!(f, "ko"),
            WinMethod::Points => write!(f, "points"),
        }
    }
}

/// Computed outcome of a decided match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning competitor
    pub winner: CompetitorRef,

    /// Which side the winner is on
    pub winner_side: Side,

    pub win_method: WinMethod,

    /// Aggregate score for competitor A
    pub score_a: u32,

    /// Aggregate score for competitor B
    pub score_b: u32,

    /// KO votes for the winner (KO decisions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ko_votes: Option<u32>,

    /// Scorecards whose point splits were summed (0 for KO decisions)
    pub judges_counted: u32,

    pub decided_at: DateTime<Utc>,
}

impl MatchResult {
    /// Score in the bracket host's `A-B` convention, e.g. `19-14`
    pub fn score_csv(&self) -> String {
        format!("{}-{}", self.score_a, self.score_b)
    }
}

/// Acknowledgement returned by the bracket host for a reported result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReceipt {
    /// Host-side reference for the updated match
    pub reference: String,

    /// Host-side match state after the update, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    pub reported_at: DateTime<Utc>,
}

/// All scoring state for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScoringRecord {
    pub match_id: MatchId,

    pub tournament_id: TournamentId,

    pub competitors: Competitors,

    /// Submitted scorecards, at most one per judge seat
    pub scorecards: BTreeMap<JudgeSeat, JudgeEntry>,

    /// Set exactly once, when the result has been reported upstream
    pub finalized: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ExternalReceipt>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl MatchScoringRecord {
    /// Create an empty record for a match
    pub fn new(
        match_id: impl Into<MatchId>,
        tournament_id: impl Into<TournamentId>,
        competitors: Competitors,
    ) -> Self {
        let now = Utc::now();
        Self {
            match_id: match_id.into(),
            tournament_id: tournament_id.into(),
            competitors,
            scorecards: BTreeMap::new(),
            finalized: false,
            result: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn judge_count(&self) -> usize {
        self.scorecards.len()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Insert or replace a judge's scorecard
    ///
    /// Returns the previous entry for that judge, if any.
    pub fn upsert_scorecard(&mut self, judge: JudgeSeat, scorecard: Scorecard) -> Option<JudgeEntry> {
        let previous = self.scorecards.insert(
            judge,
            JudgeEntry {
                scorecard,
                submitted_at: Utc::now(),
            },
        );
        self.touch();
        previous
    }

    pub fn remove_scorecard(&mut self, judge: JudgeSeat) -> Option<JudgeEntry> {
        let removed = self.scorecards.remove(&judge);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Iterate over the submitted scorecards in judge-seat order
    pub fn scorecards(&self) -> impl Iterator<Item = &Scorecard> {
        self.scorecards.values().map(|entry| &entry.scorecard)
    }

    /// Attach the reported result and close the record
    pub fn finalize(&mut self, result: MatchResult, receipt: ExternalReceipt) {
        self.finalized = true;
        self.result = Some(result);
        self.receipt = Some(receipt);
        self.touch();
    }

    /// Clear the decision and all scorecards so the match can be re-scored
    pub fn reopen(&mut self) {
        self.finalized = false;
        self.result = None;
        self.receipt = None;
        self.scorecards.clear();
        self.touch();
    }
}

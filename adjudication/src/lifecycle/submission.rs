//! Scorecard submissions: wire shape and validation
//!
//! [`SubmitRequest`] mirrors what judging clients send. It is validated
//! against the event's [`ScoringConfig`] into a [`ScorecardSubmission`]
//! before the controller touches any state.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::ValidationError;
use crate::scoring::ScoringConfig;
use crate::state::{Competitors, JudgeSeat, MatchId, Scorecard, TournamentId};

/// Scorecard submission as received from a judging client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub judge_id: Option<String>,

    #[serde(default, deserialize_with = "opaque_id")]
    pub tournament_id: Option<String>,

    #[serde(default, deserialize_with = "opaque_id")]
    pub competitor_a_id: Option<String>,

    #[serde(default, deserialize_with = "opaque_id")]
    pub competitor_b_id: Option<String>,

    /// Competitor A's share per criterion id (point splits only)
    #[serde(default)]
    pub scores: Option<BTreeMap<String, i64>>,

    #[serde(default, rename = "isKO")]
    pub is_ko: bool,

    #[serde(default, deserialize_with = "opaque_id")]
    pub ko_winner_id: Option<String>,
}

/// Bracket hosts hand out ids as strings or integers; both are kept as text
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Text(s) => s,
        Repr::Signed(n) => n.to_string(),
        Repr::Unsigned(n) => n.to_string(),
    }))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

impl SubmitRequest {
    /// Validate into a submission for `match_id`
    pub fn into_submission(
        self,
        match_id: &str,
        config: &ScoringConfig,
    ) -> Result<ScorecardSubmission, ValidationError> {
        let match_id = required(Some(match_id.to_string()), "matchId")?;
        let judge: JudgeSeat = required(self.judge_id, "judgeId")?.parse()?;
        let tournament_id = required(self.tournament_id, "tournamentId")?;
        let competitors = Competitors::new(
            required(self.competitor_a_id, "competitorAId")?,
            required(self.competitor_b_id, "competitorBId")?,
        );

        let scorecard = if self.is_ko {
            let winner = self
                .ko_winner_id
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .ok_or(ValidationError::MissingKoWinner)?;
            Scorecard::Knockout { winner }
        } else {
            let scores = self.scores.ok_or(ValidationError::MissingScores)?;
            Scorecard::PointSplit {
                shares: checked_shares(scores, config)?,
            }
        };

        let submission = ScorecardSubmission {
            match_id,
            tournament_id,
            judge,
            competitors,
            scorecard,
        };
        submission.validate(config)?;
        Ok(submission)
    }
}

/// Range-check raw shares; every configured criterion must be present
fn checked_shares(
    scores: BTreeMap<String, i64>,
    config: &ScoringConfig,
) -> Result<BTreeMap<String, u32>, ValidationError> {
    let mut shares = BTreeMap::new();
    for (criterion_id, share) in scores {
        let criterion = config
            .criterion(&criterion_id)
            .ok_or_else(|| ValidationError::UnknownCriterion(criterion_id.clone()))?;
        let share = u32::try_from(share)
            .ok()
            .filter(|s| *s <= criterion.points)
            .ok_or_else(|| ValidationError::ShareOutOfRange {
                criterion: criterion_id.clone(),
                share,
                points: criterion.points,
            })?;
        shares.insert(criterion_id, share);
    }
    Ok(shares)
}

/// A validated scorecard for one judge seat of one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorecardSubmission {
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub judge: JudgeSeat,
    pub competitors: Competitors,
    pub scorecard: Scorecard,
}

impl ScorecardSubmission {
    pub fn new(
        match_id: impl Into<MatchId>,
        tournament_id: impl Into<TournamentId>,
        judge: JudgeSeat,
        competitors: Competitors,
        scorecard: Scorecard,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            tournament_id: tournament_id.into(),
            judge,
            competitors,
            scorecard,
        }
    }

    /// Check the scorecard against the competitors and criteria
    pub fn validate(&self, config: &ScoringConfig) -> Result<(), ValidationError> {
        if self.match_id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "matchId" });
        }
        if self.tournament_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "tournamentId",
            });
        }
        if self.competitors.a == self.competitors.b {
            return Err(ValidationError::SameCompetitors);
        }

        match &self.scorecard {
            Scorecard::Knockout { winner } => {
                if self.competitors.side_of(winner).is_none() {
                    return Err(ValidationError::KoWinnerNotInMatch(winner.clone()));
                }
            }
            Scorecard::PointSplit { shares } => {
                for criterion in &config.criteria {
                    match shares.get(&criterion.id) {
                        None => return Err(ValidationError::MissingCriterion(criterion.id.clone())),
                        Some(&share) if share > criterion.points => {
                            return Err(ValidationError::ShareOutOfRange {
                                criterion: criterion.id.clone(),
                                share: i64::from(share),
                                points: criterion.points,
                            })
                        }
                        Some(_) => {}
                    }
                }
                if let Some(unknown) = shares.keys().find(|id| config.criterion(id).is_none()) {
                    return Err(ValidationError::UnknownCriterion(unknown.clone()));
                }
            }
        }

        Ok(())
    }
}

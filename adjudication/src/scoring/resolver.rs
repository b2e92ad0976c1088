//! Match resolution: KO majority first, split-point totals second
//!
//! Pure computation over a match's submitted scorecards. Nothing here
//! touches storage or the bracket host.

use chrono::Utc;
use tracing::debug;

use super::criteria::ScoringConfig;
use crate::state::{Competitors, CriterionId, JudgeSeat, MatchResult, Scorecard, Side, WinMethod};

/// KO votes for one competitor needed to decide a match by knockout
pub const KO_MAJORITY: u32 = 2;

/// Outcome of resolving a match's scorecards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Fewer than three scorecards are in
    Pending { judge_count: usize },
    /// All three are in and the match has a winner
    Decided(MatchResult),
}

/// Error type for resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Points tie {score_a}-{score_b} across {judges_counted} scorecards")]
    Tied {
        score_a: u32,
        score_b: u32,
        judges_counted: u32,
    },
}

/// One criterion of a point split with both shares
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CriterionSplit {
    pub criterion: CriterionId,
    pub a: u32,
    pub b: u32,
}

/// Decide a match from its scorecards
///
/// Returns [`Resolution::Pending`] until three scorecards are present. With
/// three, two KO votes for the same competitor decide by KO; otherwise the
/// point splits are summed. Knockout scorecards that did not reach a
/// majority contribute nothing to the points total.
pub fn resolve<'a>(
    scorecards: impl IntoIterator<Item = &'a Scorecard>,
    competitors: &Competitors,
    config: &ScoringConfig,
) -> Result<Resolution, ResolveError> {
    let cards: Vec<&Scorecard> = scorecards.into_iter().collect();

    if cards.len() < JudgeSeat::PANEL_SIZE {
        return Ok(Resolution::Pending {
            judge_count: cards.len(),
        });
    }

    if let Some((side, votes)) = ko_majority(&cards, competitors) {
        debug!(winner = %competitors.get(side), votes, "KO majority");
        return Ok(Resolution::Decided(ko_result(side, votes, competitors, config)));
    }

    points_result(&cards, competitors, config).map(Resolution::Decided)
}

/// Tally KO votes per side and return the side holding a majority, if any
fn ko_majority(cards: &[&Scorecard], competitors: &Competitors) -> Option<(Side, u32)> {
    let mut votes_a = 0u32;
    let mut votes_b = 0u32;

    for winner in cards.iter().filter_map(|c| c.ko_winner()) {
        match competitors.side_of(winner) {
            Some(Side::A) => votes_a += 1,
            Some(Side::B) => votes_b += 1,
            None => {}
        }
    }

    if votes_a >= KO_MAJORITY {
        Some((Side::A, votes_a))
    } else if votes_b >= KO_MAJORITY {
        Some((Side::B, votes_b))
    } else {
        None
    }
}

fn ko_result(side: Side, votes: u32, competitors: &Competitors, config: &ScoringConfig) -> MatchResult {
    let winner_score = config.ko_winner_score();
    let loser_score = config.ko_loser_score;
    let (score_a, score_b) = match side {
        Side::A => (winner_score, loser_score),
        Side::B => (loser_score, winner_score),
    };

    MatchResult {
        winner: competitors.get(side).clone(),
        winner_side: side,
        win_method: WinMethod::Ko,
        score_a,
        score_b,
        ko_votes: Some(votes),
        judges_counted: 0,
        decided_at: Utc::now(),
    }
}

fn points_result(
    cards: &[&Scorecard],
    competitors: &Competitors,
    config: &ScoringConfig,
) -> Result<MatchResult, ResolveError> {
    let mut total_a = 0u32;
    let mut judges_counted = 0u32;

    for card in cards {
        if let Some((a, _)) = scorecard_totals(card, config) {
            total_a += a;
            judges_counted += 1;
        }
    }

    // B is derived so that A + B always equals budget x counted cards
    let total_b = (config.point_budget() * judges_counted).saturating_sub(total_a);

    let side = match total_a.cmp(&total_b) {
        std::cmp::Ordering::Greater => Side::A,
        std::cmp::Ordering::Less => Side::B,
        std::cmp::Ordering::Equal => {
            return Err(ResolveError::Tied {
                score_a: total_a,
                score_b: total_b,
                judges_counted,
            })
        }
    };

    debug!(score_a = total_a, score_b = total_b, judges_counted, "Points decision");

    Ok(MatchResult {
        winner: competitors.get(side).clone(),
        winner_side: side,
        win_method: WinMethod::Points,
        score_a: total_a,
        score_b: total_b,
        ko_votes: None,
        judges_counted,
        decided_at: Utc::now(),
    })
}

/// Per-criterion shares of a point split, B derived from each budget
///
/// Returns `None` for knockout scorecards. Shares above a criterion's
/// budget are capped so `a + b == points` always holds.
pub fn split_breakdown(card: &Scorecard, config: &ScoringConfig) -> Option<Vec<CriterionSplit>> {
    if card.is_knockout() {
        return None;
    }

    Some(
        config
            .criteria
            .iter()
            .map(|criterion| {
                let a = card.share_a(&criterion.id).unwrap_or(0).min(criterion.points);
                CriterionSplit {
                    criterion: criterion.id.clone(),
                    a,
                    b: criterion.points - a,
                }
            })
            .collect(),
    )
}

/// A and B totals of a single point-split scorecard
pub fn scorecard_totals(card: &Scorecard, config: &ScoringConfig) -> Option<(u32, u32)> {
    let splits = split_breakdown(card, config)?;
    let a: u32 = splits.iter().map(|s| s.a).sum();
    Some((a, config.point_budget() - a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Criterion;
    use std::collections::BTreeMap;

    fn competitors() -> Competitors {
        Competitors::new("A", "B")
    }

    fn split(aggression: u32, damage: u32, control: u32) -> Scorecard {
        Scorecard::PointSplit {
            shares: BTreeMap::from([
                ("aggression".to_string(), aggression),
                ("damage".to_string(), damage),
                ("control".to_string(), control),
            ]),
        }
    }

    fn ko(winner: &str) -> Scorecard {
        Scorecard::Knockout {
            winner: winner.to_string(),
        }
    }

    fn decided(cards: &[Scorecard]) -> MatchResult {
        match resolve(cards, &competitors(), &ScoringConfig::default()).unwrap() {
            Resolution::Decided(result) => result,
            other => panic!("expected a decision, got {:?}", other),
        }
    }

    #[test]
    fn test_points_decision() {
        let result = decided(&[split(2, 3, 2), split(1, 4, 1), split(2, 2, 2)]);

        assert_eq!(result.winner, "A");
        assert_eq!(result.win_method, WinMethod::Points);
        assert_eq!((result.score_a, result.score_b), (19, 14));
        assert_eq!(result.score_csv(), "19-14");
        assert_eq!(result.judges_counted, 3);
        assert!(result.ko_votes.is_none());
    }

    #[test]
    fn test_pending_below_three_scorecards() {
        let config = ScoringConfig::default();
        let sets: Vec<Vec<Scorecard>> = vec![
            vec![],
            vec![ko("A")],
            vec![ko("A"), ko("A")],
            vec![split(3, 5, 3), split(3, 5, 3)],
        ];

        for cards in sets {
            let resolution = resolve(&cards, &competitors(), &config).unwrap();
            assert_eq!(
                resolution,
                Resolution::Pending {
                    judge_count: cards.len()
                }
            );
        }
    }

    #[test]
    fn test_ko_majority_ignores_third_card() {
        for third in [split(3, 5, 3), split(0, 0, 0), ko("A"), ko("B")] {
            let result = decided(&[ko("B"), ko("B"), third.clone()]);
            assert_eq!(result.winner, "B");
            assert_eq!(result.winner_side, Side::B);
            assert_eq!(result.win_method, WinMethod::Ko);
            assert_eq!((result.score_a, result.score_b), (0, 33));

            let expected_votes = if third == ko("B") { 3 } else { 2 };
            assert_eq!(result.ko_votes, Some(expected_votes));
        }
    }

    #[test]
    fn test_ko_majority_is_order_independent() {
        let result = decided(&[split(3, 5, 3), ko("A"), ko("A")]);
        assert_eq!(result.winner, "A");
        assert_eq!((result.score_a, result.score_b), (33, 0));
    }

    #[test]
    fn test_ko_loser_score_is_configurable() {
        let config = ScoringConfig {
            ko_loser_score: 5,
            ..ScoringConfig::default()
        };
        let cards = [ko("A"), ko("A"), ko("B")];
        let Resolution::Decided(result) = resolve(&cards, &competitors(), &config).unwrap() else {
            panic!("expected a decision");
        };
        assert_eq!((result.score_a, result.score_b), (33, 5));
    }

    #[test]
    fn test_split_ko_falls_through_to_points_card() {
        // 1-1 KO split: only the third card's point data counts
        let result = decided(&[ko("A"), ko("B"), split(2, 3, 2)]);

        assert_eq!(result.win_method, WinMethod::Points);
        assert_eq!(result.winner, "A");
        assert_eq!((result.score_a, result.score_b), (7, 4));
        assert_eq!(result.judges_counted, 1);
    }

    #[test]
    fn test_single_ko_without_majority_counts_zero_points() {
        // B leads the two point cards 10-12; the lone KO for A adds nothing
        let result = decided(&[ko("A"), split(2, 2, 1), split(1, 3, 1)]);

        assert_eq!(result.win_method, WinMethod::Points);
        assert_eq!(result.winner, "B");
        assert_eq!((result.score_a, result.score_b), (10, 12));
        assert_eq!(result.judges_counted, 2);
    }

    #[test]
    fn test_even_budget_tie_is_an_error() {
        let config = ScoringConfig::new(vec![Criterion::new("damage", "Damage", 4)], 0).unwrap();
        let card = |a: u32| Scorecard::PointSplit {
            shares: BTreeMap::from([("damage".to_string(), a)]),
        };

        let err = resolve(&[card(2), card(2), card(2)], &competitors(), &config).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Tied {
                score_a: 6,
                score_b: 6,
                judges_counted: 3
            }
        );
    }

    #[test]
    fn test_single_card_sum_invariant() {
        let config = ScoringConfig::default();
        for aggression in 0..=3 {
            for damage in 0..=5 {
                for control in 0..=3 {
                    let card = split(aggression, damage, control);
                    let splits = split_breakdown(&card, &config).unwrap();
                    for (s, criterion) in splits.iter().zip(&config.criteria) {
                        assert_eq!(s.a + s.b, criterion.points);
                    }
                    let (a, b) = scorecard_totals(&card, &config).unwrap();
                    assert_eq!(a + b, config.point_budget());
                }
            }
        }
    }

    #[test]
    fn test_points_total_matches_budget() {
        let result = decided(&[split(0, 5, 1), split(3, 0, 2), split(1, 1, 1)]);
        assert_eq!(result.score_a + result.score_b, 33);
    }

    #[test]
    fn test_knockout_has_no_breakdown() {
        assert!(split_breakdown(&ko("A"), &ScoringConfig::default()).is_none());
        assert!(scorecard_totals(&ko("A"), &ScoringConfig::default()).is_none());
    }
}

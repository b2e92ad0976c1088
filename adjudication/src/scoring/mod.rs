//! Scoring rules: criteria configuration and match resolution
//!
//! Each judge splits every criterion's points between the two competitors
//! (or declares a knockout). Three scorecards decide a match:
//!
//! 1. Two or more KO declarations for the same competitor win by `ko`.
//! 2. Otherwise A's shares across the point-split cards are summed, B's
//!    total is derived from the budget, and the higher total wins by
//!    `points`. An exact tie is reported as [`ResolveError::Tied`].

pub mod criteria;
pub mod resolver;

pub use criteria::{ConfigError, Criterion, ScoringConfig, DEFAULT_KO_LOSER_SCORE};
pub use resolver::{
    resolve, scorecard_totals, split_breakdown, CriterionSplit, Resolution, ResolveError,
    KO_MAJORITY,
};

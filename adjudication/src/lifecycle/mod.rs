//! Match lifecycle: submission, resolution, reporting, finalization
//!
//! The [`MatchController`] owns the finalize-once protocol. A match moves
//! `open → collecting → finalized`; the third scorecard triggers
//! resolution and an upstream report, and only after the bracket host
//! accepts the result is the record marked finalized. Finalized matches
//! reject further scorecards until they are explicitly reopened.

pub mod controller;
pub mod error;
pub mod locks;
pub mod phase;
pub mod submission;

pub use controller::{
    JudgeBreakdown, MatchController, MatchDetail, MatchStatus, SharedMatchController,
    SubmitOutcome,
};
pub use error::{AdjudicationError, AdjudicationResult, ValidationError};
pub use locks::MatchLocks;
pub use phase::MatchPhase;
pub use submission::{ScorecardSubmission, SubmitRequest};

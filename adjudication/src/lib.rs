//! Adjudication core for judged head-to-head matches
//!
//! This library provides:
//! - A scorecard store keyed by match id (memory, RocksDB, PostgreSQL)
//! - Match resolution: KO majority first, split-point totals second
//! - A lifecycle controller that finalizes each match exactly once
//! - The bracket reporting contract the controller pushes results through
//!
//! # Scoring
//!
//! Three fixed judge seats (`judge_1`..`judge_3`) each submit either a
//! point split (competitor A's share of every criterion, B's share implied)
//! or a knockout declaration. When the third scorecard arrives:
//!
//! - two KO votes for the same competitor win by `ko`, `33-0` with the
//!   default criteria
//! - otherwise the point splits are summed and the higher total wins by
//!   `points`
//!
//! # Usage
//!
//! ```ignore
//! use adjudication::{EventBus, MatchController, MemoryScorecardStore, RecordingReporter, ScoringConfig};
//!
//! let controller = MatchController::new(
//!     MemoryScorecardStore::new().shared(),
//!     Arc::new(RecordingReporter::new()),
//!     EventBus::new().shared(),
//!     ScoringConfig::default(),
//! );
//! let outcome = controller.submit_scorecard(submission).await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod events;
pub mod lifecycle;
pub mod reporting;
pub mod scoring;
pub mod state;

// Re-export key lifecycle types
pub use lifecycle::{
    AdjudicationError, AdjudicationResult, JudgeBreakdown, MatchController, MatchDetail,
    MatchPhase, MatchStatus, ScorecardSubmission, SharedMatchController, SubmitOutcome,
    SubmitRequest, ValidationError,
};

// Re-export key scoring types
pub use scoring::{
    resolve, ConfigError, Criterion, CriterionSplit, Resolution, ResolveError, ScoringConfig,
};

// Re-export key state types
pub use state::{
    Competitors, JudgeSeat, MatchResult, MatchScoringRecord, MemoryScorecardStore, Scorecard,
    ScorecardStore, SharedScorecardStore, Side, StoreError, WinMethod,
};

// Re-export key event types
pub use events::{EventBus, ScoringEvent, SharedEventBus};

// Re-export reporting types
pub use reporting::{BracketReporter, RecordingReporter, ReportError, SharedBracketReporter};

//! Match scoring state and its persistence
//!
//! One [`MatchScoringRecord`] per match id holds the two competitor refs,
//! the tournament id, the judge-seat → scorecard map, the finalized flag
//! and, once decided, the result and host receipt. The shape is the same
//! for every backend:
//!
//! - `memory`: process-local map (default)
//! - `rocksdb` (feature `rocksdb`): one column family, JSON values
//! - `postgres` (feature `postgres`): one row per match, JSONB blobs
//!
//! # Usage
//!
//! ```ignore
//! use adjudication::state::{Competitors, MatchScoringRecord, MemoryScorecardStore, ScorecardStore};
//!
//! let store = MemoryScorecardStore::new().shared();
//! let record = MatchScoringRecord::new("417", "spring-open", Competitors::new("101", "202"));
//! store.put("417", &record).await?;
//! ```

pub mod schema;
pub mod store;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "rocksdb")]
pub mod rocks;

// Re-export core types
pub use store::{
    MemoryScorecardStore, ScorecardStore, SharedScorecardStore, StoreError, StoreResult,
};
pub use types::{
    CompetitorRef, Competitors, CriterionId, ExternalReceipt, JudgeEntry, JudgeSeat, MatchId,
    MatchResult, MatchScoringRecord, ParseJudgeSeatError, Scorecard, Side, TournamentId,
    WinMethod,
};

#[cfg(feature = "postgres")]
pub use postgres::PostgresScorecardStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksScorecardStore;

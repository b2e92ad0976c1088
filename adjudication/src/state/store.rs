//! Scorecard store contract and the in-memory backend
//!
//! A store keeps one [`MatchScoringRecord`] per match id with full-record
//! upsert semantics. Stores are safe to call concurrently for different
//! matches; serializing read-modify-write on a single match is the
//! controller's job.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::types::{JudgeSeat, MatchId, MatchScoringRecord};

/// Error type for scorecard store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Match already finalized: {0}")]
    AlreadyFinalized(MatchId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record key mismatch: put under {key} but record is for {record}")]
    KeyMismatch { key: MatchId, record: MatchId },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for scorecard store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a scorecard store
pub type SharedScorecardStore = Arc<dyn ScorecardStore>;

/// Durable keyed storage of match scoring records
#[async_trait]
pub trait ScorecardStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Load the record for a match; `None` means no scorecards yet
    async fn get(&self, match_id: &str) -> StoreResult<Option<MatchScoringRecord>>;

    /// Replace the whole record stored for a match
    async fn put(&self, match_id: &str, record: &MatchScoringRecord) -> StoreResult<()>;

    /// All records belonging to a tournament, oldest first
    async fn list(&self, tournament_id: &str) -> StoreResult<Vec<MatchScoringRecord>>;

    /// Remove one judge's scorecard from an unfinalized record
    ///
    /// Returns the updated record.
    async fn delete_judge_scorecard(
        &self,
        match_id: &str,
        judge: JudgeSeat,
    ) -> StoreResult<MatchScoringRecord> {
        let mut record = self
            .get(match_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no scorecards for match {}", match_id)))?;

        remove_from_record(&mut record, judge)?;
        self.put(match_id, &record).await?;
        Ok(record)
    }
}

/// Apply the finalized/not-found guards and drop one judge's entry
pub(crate) fn remove_from_record(
    record: &mut MatchScoringRecord,
    judge: JudgeSeat,
) -> StoreResult<()> {
    if record.finalized {
        return Err(StoreError::AlreadyFinalized(record.match_id.clone()));
    }
    if record.remove_scorecard(judge).is_none() {
        return Err(StoreError::NotFound(format!(
            "{} has no scorecard for match {}",
            judge, record.match_id
        )));
    }
    Ok(())
}

pub(crate) fn check_key(match_id: &str, record: &MatchScoringRecord) -> StoreResult<()> {
    if record.match_id != match_id {
        return Err(StoreError::KeyMismatch {
            key: match_id.to_string(),
            record: record.match_id.clone(),
        });
    }
    Ok(())
}

/// Process-local store backed by a hash map
#[derive(Default)]
pub struct MemoryScorecardStore {
    records: RwLock<HashMap<MatchId, MatchScoringRecord>>,
}

impl MemoryScorecardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedScorecardStore {
        Arc::new(self)
    }

    /// Number of matches with a stored record
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ScorecardStore for MemoryScorecardStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, match_id: &str) -> StoreResult<Option<MatchScoringRecord>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(match_id).cloned())
    }

    async fn put(&self, match_id: &str, record: &MatchScoringRecord) -> StoreResult<()> {
        check_key(match_id, record)?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(match_id.to_string(), record.clone());
        Ok(())
    }

    async fn list(&self, tournament_id: &str) -> StoreResult<Vec<MatchScoringRecord>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut matching: Vec<MatchScoringRecord> = records
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn delete_judge_scorecard(
        &self,
        match_id: &str,
        judge: JudgeSeat,
    ) -> StoreResult<MatchScoringRecord> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(match_id)
            .ok_or_else(|| StoreError::NotFound(format!("no scorecards for match {}", match_id)))?;

        remove_from_record(record, judge)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::{Competitors, ExternalReceipt, MatchResult, Scorecard, Side, WinMethod};
    use chrono::Utc;

    fn ko(winner: &str) -> Scorecard {
        Scorecard::Knockout {
            winner: winner.to_string(),
        }
    }

    fn record(match_id: &str, tournament_id: &str) -> MatchScoringRecord {
        MatchScoringRecord::new(match_id, tournament_id, Competitors::new("a", "b"))
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryScorecardStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_record() {
        let store = MemoryScorecardStore::new();

        let mut first = record("m1", "t1");
        first.upsert_scorecard(JudgeSeat::Judge1, ko("a"));
        store.put("m1", &first).await.unwrap();

        let second = record("m1", "t1");
        store.put("m1", &second).await.unwrap();

        let stored = store.get("m1").await.unwrap().unwrap();
        assert_eq!(stored.judge_count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_key_mismatch() {
        let store = MemoryScorecardStore::new();
        let err = store.put("m2", &record("m1", "t1")).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_delete_judge_scorecard() {
        let store = MemoryScorecardStore::new();
        let mut rec = record("m1", "t1");
        rec.upsert_scorecard(JudgeSeat::Judge1, ko("a"));
        rec.upsert_scorecard(JudgeSeat::Judge2, ko("b"));
        store.put("m1", &rec).await.unwrap();

        let updated = store
            .delete_judge_scorecard("m1", JudgeSeat::Judge1)
            .await
            .unwrap();
        assert_eq!(updated.judge_count(), 1);

        let err = store
            .delete_judge_scorecard("m1", JudgeSeat::Judge1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store
            .delete_judge_scorecard("other", JudgeSeat::Judge1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_refused_after_finalize() {
        let store = MemoryScorecardStore::new();
        let mut rec = record("m1", "t1");
        rec.upsert_scorecard(JudgeSeat::Judge1, ko("a"));
        rec.finalize(
            MatchResult {
                winner: "a".into(),
                winner_side: Side::A,
                win_method: WinMethod::Ko,
                score_a: 33,
                score_b: 0,
                ko_votes: Some(2),
                judges_counted: 0,
                decided_at: Utc::now(),
            },
            ExternalReceipt {
                reference: "m1".into(),
                state: Some("complete".into()),
                reported_at: Utc::now(),
            },
        );
        store.put("m1", &rec).await.unwrap();

        let err = store
            .delete_judge_scorecard("m1", JudgeSeat::Judge1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyFinalized(_)));
        assert_eq!(store.get("m1").await.unwrap().unwrap(), rec);
    }

    #[tokio::test]
    async fn test_list_filters_by_tournament() {
        let store = MemoryScorecardStore::new();
        store.put("m1", &record("m1", "t1")).await.unwrap();
        store.put("m2", &record("m2", "t2")).await.unwrap();
        store.put("m3", &record("m3", "t1")).await.unwrap();

        let listed = store.list("t1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.match_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"m1") && ids.contains(&"m3"));
    }
}

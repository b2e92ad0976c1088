//! Storage layout shared by the store backends
//!
//! Every backend keeps one record per match identifier. The key-value
//! backend stores JSON values under `match:{id}`; the relational backend
//! keeps the same fields as columns with JSON blobs for the scorecard map,
//! result and receipt.

/// Column family holding match scoring records
pub const CF_MATCH_RECORDS: &str = "match_records";

/// All column family names
pub const ALL_CFS: &[&str] = &[CF_MATCH_RECORDS];

/// Key prefixes for compound keys
pub mod keys {
    /// Prefix shared by all match record keys
    pub const MATCH_PREFIX: &str = "match:";

    /// Create a match record key
    pub fn match_record(match_id: &str) -> String {
        format!("{}{}", MATCH_PREFIX, match_id)
    }
}

/// SQL for the relational backend
pub mod sql {
    pub const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS match_scorecards (
    match_id      TEXT PRIMARY KEY,
    tournament_id TEXT NOT NULL,
    competitor_a  TEXT NOT NULL,
    competitor_b  TEXT NOT NULL,
    scorecards    JSONB NOT NULL,
    finalized     BOOLEAN NOT NULL DEFAULT FALSE,
    result        JSONB,
    receipt       JSONB,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
)";

    pub const CREATE_TOURNAMENT_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS match_scorecards_tournament_idx
    ON match_scorecards (tournament_id)";

    pub const SELECT_COLUMNS: &str = "match_id, tournament_id, competitor_a, competitor_b, \
scorecards, finalized, result, receipt, created_at, updated_at";

    pub const UPSERT: &str = "\
INSERT INTO match_scorecards
    (match_id, tournament_id, competitor_a, competitor_b, scorecards,
     finalized, result, receipt, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (match_id) DO UPDATE SET
    tournament_id = EXCLUDED.tournament_id,
    competitor_a  = EXCLUDED.competitor_a,
    competitor_b  = EXCLUDED.competitor_b,
    scorecards    = EXCLUDED.scorecards,
    finalized     = EXCLUDED.finalized,
    result        = EXCLUDED.result,
    receipt       = EXCLUDED.receipt,
    updated_at    = EXCLUDED.updated_at";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        assert_eq!(keys::match_record("417"), "match:417");
        assert!(keys::match_record("417").starts_with(keys::MATCH_PREFIX));
    }
}

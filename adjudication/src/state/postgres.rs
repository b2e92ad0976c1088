//! PostgreSQL-backed scorecard store
//!
//! One row per match in `match_scorecards`. Competitor refs, tournament id
//! and the finalized flag are plain columns; the judge map, result and
//! receipt are JSONB.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::types::Json;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

use super::schema::sql;
use super::store::{check_key, ScorecardStore, SharedScorecardStore, StoreError, StoreResult};
use super::types::{
    Competitors, ExternalReceipt, JudgeEntry, JudgeSeat, MatchResult, MatchScoringRecord,
};

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Scorecard store on a single PostgreSQL connection
pub struct PostgresScorecardStore {
    client: Client,
}

impl PostgresScorecardStore {
    /// Connect and spawn the connection driver on the current runtime
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection closed: {}", e);
            }
        });

        info!("Connected to PostgreSQL scorecard store");
        Ok(Self { client })
    }

    /// Create the table and index if they do not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        self.client.batch_execute(sql::CREATE_TABLE).await?;
        self.client.batch_execute(sql::CREATE_TOURNAMENT_INDEX).await?;
        Ok(())
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedScorecardStore {
        Arc::new(self)
    }
}

fn record_from_row(row: &Row) -> StoreResult<MatchScoringRecord> {
    let scorecards: Json<BTreeMap<JudgeSeat, JudgeEntry>> = row
        .try_get("scorecards")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let result: Option<Json<MatchResult>> = row
        .try_get("result")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let receipt: Option<Json<ExternalReceipt>> = row
        .try_get("receipt")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    let get_text = |column: &str| -> StoreResult<String> {
        row.try_get(column)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    };
    let get_time = |column: &str| -> StoreResult<DateTime<Utc>> {
        row.try_get(column)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    };

    Ok(MatchScoringRecord {
        match_id: get_text("match_id")?,
        tournament_id: get_text("tournament_id")?,
        competitors: Competitors::new(get_text("competitor_a")?, get_text("competitor_b")?),
        scorecards: scorecards.0,
        finalized: row
            .try_get("finalized")
            .map_err(|e| StoreError::Deserialization(e.to_string()))?,
        result: result.map(|j| j.0),
        receipt: receipt.map(|j| j.0),
        created_at: get_time("created_at")?,
        updated_at: get_time("updated_at")?,
    })
}

#[async_trait]
impl ScorecardStore for PostgresScorecardStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, match_id: &str) -> StoreResult<Option<MatchScoringRecord>> {
        let query = format!(
            "SELECT {} FROM match_scorecards WHERE match_id = $1",
            sql::SELECT_COLUMNS
        );
        let row = self.client.query_opt(query.as_str(), &[&match_id]).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn put(&self, match_id: &str, record: &MatchScoringRecord) -> StoreResult<()> {
        check_key(match_id, record)?;

        let scorecards = Json(&record.scorecards);
        let result = record.result.as_ref().map(Json);
        let receipt = record.receipt.as_ref().map(Json);

        self.client
            .execute(
                sql::UPSERT,
                &[
                    &record.match_id,
                    &record.tournament_id,
                    &record.competitors.a,
                    &record.competitors.b,
                    &scorecards,
                    &record.finalized,
                    &result,
                    &receipt,
                    &record.created_at,
                    &record.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn list(&self, tournament_id: &str) -> StoreResult<Vec<MatchScoringRecord>> {
        let query = format!(
            "SELECT {} FROM match_scorecards WHERE tournament_id = $1 ORDER BY created_at",
            sql::SELECT_COLUMNS
        );
        let rows = self.client.query(query.as_str(), &[&tournament_id]).await?;
        rows.iter().map(record_from_row).collect()
    }
}

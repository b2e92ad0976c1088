//! RocksDB-backed scorecard store
//!
//! Records live in the `match_records` column family as JSON values keyed
//! by `match:{id}`. JSON keeps stored records readable with `ldb` and
//! matches the wire format.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use super::schema::{self, ALL_CFS, CF_MATCH_RECORDS};
use super::store::{check_key, ScorecardStore, SharedScorecardStore, StoreError, StoreResult};
use super::types::MatchScoringRecord;

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// RocksDB-backed persistent scorecard store
pub struct RocksScorecardStore {
    db: RwLock<DB>,
    path: PathBuf,
}

impl RocksScorecardStore {
    /// Open or create a store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedScorecardStore {
        Arc::new(self)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_record(&self, key: &str) -> StoreResult<Option<MatchScoringRecord>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(CF_MATCH_RECORDS)
            .ok_or_else(|| StoreError::Backend(format!("missing column family {}", CF_MATCH_RECORDS)))?;

        match db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn write_record(&self, key: &str, record: &MatchScoringRecord) -> StoreResult<()> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(CF_MATCH_RECORDS)
            .ok_or_else(|| StoreError::Backend(format!("missing column family {}", CF_MATCH_RECORDS)))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    fn scan_records(&self) -> StoreResult<Vec<MatchScoringRecord>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(CF_MATCH_RECORDS)
            .ok_or_else(|| StoreError::Backend(format!("missing column family {}", CF_MATCH_RECORDS)))?;

        let prefix = schema::keys::MATCH_PREFIX;
        let mut records = Vec::new();
        for item in db.prefix_iterator_cf(&cf, prefix.as_bytes()) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let record: MatchScoringRecord = serde_json::from_slice(&value)
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl ScorecardStore for RocksScorecardStore {
    fn backend_name(&self) -> &'static str {
        "rocksdb"
    }

    async fn get(&self, match_id: &str) -> StoreResult<Option<MatchScoringRecord>> {
        self.read_record(&schema::keys::match_record(match_id))
    }

    async fn put(&self, match_id: &str, record: &MatchScoringRecord) -> StoreResult<()> {
        check_key(match_id, record)?;
        self.write_record(&schema::keys::match_record(match_id), record)
    }

    async fn list(&self, tournament_id: &str) -> StoreResult<Vec<MatchScoringRecord>> {
        let mut records: Vec<MatchScoringRecord> = self
            .scan_records()?
            .into_iter()
            .filter(|r| r.tournament_id == tournament_id)
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

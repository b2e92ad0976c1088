//! Server configuration
//!
//! Every setting has an environment default; CLI flags override them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use adjudication::reporting::{RecordingReporter, SharedBracketReporter};
use adjudication::scoring::ScoringConfig;
use adjudication::state::{MemoryScorecardStore, SharedScorecardStore};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::challonge::ChallongeReporter;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_STATE_PATH: &str = "./judge-state";
pub const DEFAULT_CHALLONGE_URL: &str = "https://api.challonge.com/v1";
pub const DEFAULT_CHALLONGE_TIMEOUT_SECS: u64 = 15;

/// Which scorecard store backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    Memory,
    Rocksdb,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::Rocksdb),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown store backend '{other}' (memory, rocksdb, postgres)"),
        }
    }
}

/// Connection settings for a Challonge-style bracket host
#[derive(Debug, Clone)]
pub struct ChallongeConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// TOML criteria file; built-in criteria when unset
    pub criteria_path: Option<PathBuf>,
    pub store: StoreBackend,
    /// RocksDB directory
    pub state_path: PathBuf,
    pub database_url: Option<String>,
    /// Bracket host; results are only recorded locally when unset
    pub challonge: Option<ChallongeConfig>,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("JUDGE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("JUDGE_BIND_ADDR is not a socket address")?;

        let store = match lookup("JUDGE_STORE") {
            Some(value) => value.parse().context("invalid JUDGE_STORE")?,
            None => StoreBackend::Memory,
        };

        let challonge = match lookup("CHALLONGE_API_KEY").filter(|k| !k.trim().is_empty()) {
            Some(api_key) => {
                let timeout_secs = match lookup("CHALLONGE_TIMEOUT_SECS") {
                    Some(value) => value
                        .trim()
                        .parse()
                        .context("CHALLONGE_TIMEOUT_SECS is not a number of seconds")?,
                    None => DEFAULT_CHALLONGE_TIMEOUT_SECS,
                };
                Some(ChallongeConfig {
                    api_key,
                    base_url: lookup("CHALLONGE_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_CHALLONGE_URL.to_string()),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            criteria_path: lookup("JUDGE_CRITERIA_PATH").map(PathBuf::from),
            store,
            state_path: lookup("JUDGE_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            database_url: lookup("JUDGE_DATABASE_URL"),
            challonge,
        })
    }

    /// Load the scoring criteria for this event
    pub fn scoring_config(&self) -> Result<ScoringConfig> {
        match &self.criteria_path {
            Some(path) => ScoringConfig::load(path)
                .with_context(|| format!("failed to load criteria from {}", path.display())),
            None => Ok(ScoringConfig::default()),
        }
    }

    /// Open the configured scorecard store
    pub async fn open_store(&self) -> Result<SharedScorecardStore> {
        match self.store {
            StoreBackend::Memory => {
                warn!("Using in-memory scorecard store; scorecards are lost on restart");
                Ok(MemoryScorecardStore::new().shared())
            }
            StoreBackend::Rocksdb => self.open_rocksdb(),
            StoreBackend::Postgres => self.open_postgres().await,
        }
    }

    #[cfg(feature = "rocksdb")]
    fn open_rocksdb(&self) -> Result<SharedScorecardStore> {
        let store = adjudication::state::RocksScorecardStore::open(&self.state_path)
            .with_context(|| format!("failed to open RocksDB at {}", self.state_path.display()))?;
        info!(path = %self.state_path.display(), "Opened RocksDB scorecard store");
        Ok(store.shared())
    }

    #[cfg(not(feature = "rocksdb"))]
    fn open_rocksdb(&self) -> Result<SharedScorecardStore> {
        anyhow::bail!("judge-server was built without the `rocksdb` feature")
    }

    #[cfg(feature = "postgres")]
    async fn open_postgres(&self) -> Result<SharedScorecardStore> {
        let url = self
            .database_url
            .as_deref()
            .context("JUDGE_DATABASE_URL is required for the postgres store")?;
        let store = adjudication::state::PostgresScorecardStore::connect(url)
            .await
            .context("failed to connect to PostgreSQL")?;
        store.migrate().await.context("failed to create scorecard table")?;
        info!("Opened PostgreSQL scorecard store");
        Ok(store.shared())
    }

    #[cfg(not(feature = "postgres"))]
    async fn open_postgres(&self) -> Result<SharedScorecardStore> {
        anyhow::bail!("judge-server was built without the `postgres` feature")
    }

    /// Build the bracket reporter: Challonge when configured, local otherwise
    pub fn bracket_reporter(&self) -> Result<SharedBracketReporter> {
        match &self.challonge {
            Some(challonge) => {
                let reporter = ChallongeReporter::new(challonge)?;
                info!(base_url = %challonge.base_url, "Reporting results to Challonge");
                Ok(Arc::new(reporter))
            }
            None => {
                warn!("CHALLONGE_API_KEY not set; results are recorded locally only");
                Ok(Arc::new(RecordingReporter::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.store, StoreBackend::Memory);
        assert!(config.criteria_path.is_none());
        assert!(config.challonge.is_none());
        assert_eq!(config.scoring_config().unwrap().point_budget(), 11);
    }

    #[test]
    fn test_challonge_settings() {
        let config = config_from(&[
            ("CHALLONGE_API_KEY", "secret"),
            ("CHALLONGE_TIMEOUT_SECS", "3"),
            ("JUDGE_STORE", "RocksDB"),
        ])
        .unwrap();

        let challonge = config.challonge.unwrap();
        assert_eq!(challonge.base_url, DEFAULT_CHALLONGE_URL);
        assert_eq!(challonge.timeout, Duration::from_secs(3));
        assert_eq!(config.store, StoreBackend::Rocksdb);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("JUDGE_BIND_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("JUDGE_STORE", "redis")]).is_err());
        assert!(config_from(&[("CHALLONGE_API_KEY", "k"), ("CHALLONGE_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_criteria_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("criteria.toml");
        std::fs::write(
            &path,
            "[[criteria]]\nid = \"damage\"\nname = \"Damage\"\npoints = 7\n",
        )
        .unwrap();

        let config = config_from(&[("JUDGE_CRITERIA_PATH", path.to_str().unwrap())]).unwrap();
        assert_eq!(config.scoring_config().unwrap().point_budget(), 7);

        let missing = config_from(&[("JUDGE_CRITERIA_PATH", "/no/such/criteria.toml")]).unwrap();
        assert!(missing.scoring_config().is_err());
    }

    #[tokio::test]
    async fn test_memory_store_opens() {
        let config = config_from(&[]).unwrap();
        let store = config.open_store().await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(config.bracket_reporter().unwrap().name(), "recording");
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

use adjudication::events::{EventBus, ScoringEvent};
use adjudication::lifecycle::MatchController;
use anyhow::{Context, Result};
use clap::Parser;
use judge_server::{router, AppState, ServerConfig, StoreBackend};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Three-judge scoring desk with bracket-host reporting
#[derive(Parser, Debug)]
#[command(name = "judge-server", version, about)]
struct Args {
    /// Address to listen on (overrides JUDGE_BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// TOML file with scoring criteria (overrides JUDGE_CRITERIA_PATH)
    #[arg(long)]
    criteria: Option<PathBuf>,

    /// Scorecard store backend (overrides JUDGE_STORE)
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// RocksDB directory (overrides JUDGE_STATE_PATH)
    #[arg(long)]
    state_path: Option<PathBuf>,

    /// PostgreSQL connection string (overrides JUDGE_DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(criteria) = self.criteria {
            config.criteria_path = Some(criteria);
        }
        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(state_path) = self.state_path {
            config.state_path = state_path;
        }
        if let Some(database_url) = self.database_url {
            config.database_url = Some(database_url);
        }
    }
}

/// Log every scoring event until the bus closes
async fn log_events(bus: &EventBus) {
    let mut events = bus.subscribe();
    loop {
        match events.recv().await {
            Ok(ScoringEvent::ReportFailed {
                match_id,
                error,
                retryable,
                ..
            }) => {
                warn!(%match_id, %error, retryable, "Match awaiting report retry");
            }
            Ok(event) => {
                info!(
                    event_type = event.event_type(),
                    match_id = event.match_id(),
                    "Scoring event"
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    args.apply(&mut config);

    let scoring = config.scoring_config()?;
    let store = config.open_store().await?;
    let reporter = config.bracket_reporter()?;
    let event_bus = EventBus::new().shared();

    let logger_bus = event_bus.clone();
    tokio::spawn(async move { log_events(&logger_bus).await });

    let controller = MatchController::new(store, reporter, event_bus, scoring).shared();
    let app = router(AppState { controller });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, store = ?config.store, "Judge server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("judge server error")?;

    Ok(())
}

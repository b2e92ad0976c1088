//! Bracket reporting adapter contract
//!
//! The controller pushes each finalized result to the external bracket
//! host through a [`BracketReporter`], and asks it to reopen a match when
//! a decided result is corrected. HTTP adapters live with the service;
//! [`RecordingReporter`] keeps reports in-process for offline runs and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::ExternalReceipt;

/// Error type for bracket host calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("Bracket host unreachable: {0}")]
    Transport(String),

    #[error("Bracket host rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Bracket host rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Malformed bracket host response: {0}")]
    Malformed(String),

    #[error("Cannot address bracket host match: {0}")]
    InvalidTarget(String),
}

impl ReportError {
    /// Whether retrying the same report later can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Transport(_) | ReportError::RateLimited { .. } => true,
            ReportError::Rejected { status, .. } => *status >= 500,
            ReportError::Malformed(_) | ReportError::InvalidTarget(_) => false,
        }
    }
}

/// Shared reference to a bracket reporter
pub type SharedBracketReporter = Arc<dyn BracketReporter>;

/// Narrow interface to the external bracket host
#[async_trait]
pub trait BracketReporter: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &'static str;

    /// Record the winner and `A-B` score of a match upstream
    async fn report_result(
        &self,
        tournament_id: &str,
        match_id: &str,
        winner: &str,
        score_a: u32,
        score_b: u32,
    ) -> Result<ExternalReceipt, ReportError>;

    /// Reopen a previously reported match upstream
    async fn reopen_match(&self, tournament_id: &str, match_id: &str) -> Result<(), ReportError>;
}

/// Score in the bracket host's `A-B` convention
pub fn score_csv(score_a: u32, score_b: u32) -> String {
    format!("{}-{}", score_a, score_b)
}

/// A report received by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCall {
    pub tournament_id: String,
    pub match_id: String,
    pub winner: String,
    pub scores_csv: String,
}

/// In-process reporter that records every call
///
/// Used when no bracket host is configured and as a test double. It can be
/// switched into a failing mode and given artificial latency.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<ReportCall>>,
    reopens: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make subsequent calls fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reports(&self) -> Vec<ReportCall> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reopens(&self) -> Vec<(String, String)> {
        self.reopens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn simulate_call(&self) -> Result<(), ReportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::Transport("bracket host offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BracketReporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn report_result(
        &self,
        tournament_id: &str,
        match_id: &str,
        winner: &str,
        score_a: u32,
        score_b: u32,
    ) -> Result<ExternalReceipt, ReportError> {
        self.simulate_call().await?;

        let call = ReportCall {
            tournament_id: tournament_id.to_string(),
            match_id: match_id.to_string(),
            winner: winner.to_string(),
            scores_csv: score_csv(score_a, score_b),
        };
        info!(
            tournament_id,
            match_id,
            winner,
            scores = %call.scores_csv,
            "Recorded match result"
        );
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        Ok(ExternalReceipt {
            reference: format!("recorded:{}", match_id),
            state: Some("complete".to_string()),
            reported_at: Utc::now(),
        })
    }

    async fn reopen_match(&self, tournament_id: &str, match_id: &str) -> Result<(), ReportError> {
        self.simulate_call().await?;
        self.reopens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((tournament_id.to_string(), match_id.to_string()));
        Ok(())
    }
}

//! HTTP surface for judging clients
//!
//! All responses are JSON. Successful bodies carry `success: true`; errors
//! carry `success: false` plus a stable `code`, a message and whether the
//! same request may be retried.

use adjudication::lifecycle::{
    AdjudicationError, JudgeBreakdown, MatchDetail, MatchPhase, MatchStatus,
    SharedMatchController, SubmitOutcome, SubmitRequest, ValidationError,
};
use adjudication::scoring::{Criterion, CriterionSplit};
use adjudication::state::{JudgeSeat, MatchResult, WinMethod};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub controller: SharedMatchController,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/criteria", get(criteria))
        .route(
            "/api/matches/:match_id/scores",
            post(submit_scores).get(match_detail),
        )
        .route("/api/matches/:match_id/scores/status", get(match_status))
        .route(
            "/api/matches/:match_id/scores/:judge_id",
            delete(delete_scorecard),
        )
        .route("/api/matches/:match_id/reopen", post(reopen_match))
        .route("/api/matches/:match_id/report", post(retry_report))
        .route(
            "/api/tournaments/:tournament_id/matches",
            get(tournament_matches),
        )
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// Error returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Adjudication(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error
    ///
    /// - Malformed body / validation: 400
    /// - Unknown match or judge scorecard: 404
    /// - Finalized, not finalized, not ready: 409
    /// - Points tie: 422
    /// - Bracket host failure: 502
    /// - Store failure: 503
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Adjudication(err) => match err {
                AdjudicationError::Validation(_) => StatusCode::BAD_REQUEST,
                AdjudicationError::NotFound(_) => StatusCode::NOT_FOUND,
                AdjudicationError::AlreadyFinalized { .. }
                | AdjudicationError::NotFinalized { .. }
                | AdjudicationError::NotReady { .. } => StatusCode::CONFLICT,
                AdjudicationError::TiedMatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AdjudicationError::UpstreamReport(_) => StatusCode::BAD_GATEWAY,
                AdjudicationError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidBody(_) => "INVALID_BODY",
            ApiError::Adjudication(err) => err.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::InvalidBody(_) => false,
            ApiError::Adjudication(err) => err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store details stay in the log
        let message = match &self {
            ApiError::Adjudication(AdjudicationError::Store(err)) => {
                error!(error = %err, "Scorecard store failure");
                "scorecard storage is unavailable".to_string()
            }
            other => {
                debug!(status = status.as_u16(), error = %other, "Request rejected");
                other.to_string()
            }
        };

        let body = json!({
            "success": false,
            "code": self.code(),
            "error": message,
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Response bodies
// =============================================================================

/// Successful response: `success: true` plus the flattened payload
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn ok<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub winner_id: String,
    pub win_method: WinMethod,
    pub score_a: u32,
    pub score_b: u32,
    pub scores_csv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ko_votes: Option<u32>,
    pub decided_at: DateTime<Utc>,
}

impl From<&MatchResult> for ResultView {
    fn from(result: &MatchResult) -> Self {
        Self {
            winner_id: result.winner.clone(),
            win_method: result.win_method,
            score_a: result.score_a,
            score_b: result.score_b,
            scores_csv: result.score_csv(),
            ko_votes: result.ko_votes,
            decided_at: result.decided_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitView {
    pub judge_count: usize,
    pub finalized: bool,
    pub result: Option<ResultView>,
}

impl From<SubmitOutcome> for SubmitView {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            judge_count: outcome.judge_count,
            finalized: outcome.finalized,
            result: outcome.result.as_ref().map(ResultView::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub match_id: String,
    pub judge_count: usize,
    pub finalized: bool,
    pub phase: MatchPhase,
    pub judges: Vec<JudgeSeat>,
    pub result: Option<ResultView>,
}

impl From<&MatchStatus> for StatusView {
    fn from(status: &MatchStatus) -> Self {
        Self {
            match_id: status.match_id.clone(),
            judge_count: status.judge_count,
            finalized: status.finalized,
            phase: status.phase,
            judges: status.judges.clone(),
            result: status.result.as_ref().map(ResultView::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorecardView {
    pub judge_id: JudgeSeat,
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "isKO")]
    pub is_ko: bool,
    pub ko_winner_id: Option<String>,
    pub criteria: Vec<CriterionSplit>,
    pub total_a: Option<u32>,
    pub total_b: Option<u32>,
}

impl From<&JudgeBreakdown> for ScorecardView {
    fn from(card: &JudgeBreakdown) -> Self {
        Self {
            judge_id: card.judge,
            submitted_at: card.submitted_at,
            is_ko: card.knockout,
            ko_winner_id: card.ko_winner.clone(),
            criteria: card.criteria.clone(),
            total_a: card.total_a,
            total_b: card.total_b,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    #[serde(flatten)]
    pub status: StatusView,
    pub tournament_id: String,
    pub competitor_a_id: String,
    pub competitor_b_id: String,
    pub scorecards: Vec<ScorecardView>,
    pub external_reference: Option<String>,
}

impl From<&MatchDetail> for DetailView {
    fn from(detail: &MatchDetail) -> Self {
        Self {
            status: StatusView::from(&detail.status),
            tournament_id: detail.tournament_id.clone(),
            competitor_a_id: detail.competitors.a.clone(),
            competitor_b_id: detail.competitors.b.clone(),
            scorecards: detail.scorecards.iter().map(ScorecardView::from).collect(),
            external_reference: detail.receipt.as_ref().map(|r| r.reference.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaView {
    pub criteria: Vec<Criterion>,
    pub point_budget: u32,
    pub ko_winner_score: u32,
    pub ko_loser_score: u32,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn criteria(State(state): State<AppState>) -> Json<Success<CriteriaView>> {
    let config = state.controller.config();
    ok(CriteriaView {
        criteria: config.criteria.clone(),
        point_budget: config.point_budget(),
        ko_winner_score: config.ko_winner_score(),
        ko_loser_score: config.ko_loser_score,
    })
}

async fn submit_scores(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<Success<SubmitView>>, ApiError> {
    let Json(request) = payload?;
    let submission = request.into_submission(&match_id, state.controller.config())?;
    let outcome = state.controller.submit_scorecard(submission).await?;
    Ok(ok(SubmitView::from(outcome)))
}

async fn match_status(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Success<StatusView>>, ApiError> {
    let status = state.controller.get_status(&match_id).await?;
    Ok(ok(StatusView::from(&status)))
}

async fn match_detail(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Success<DetailView>>, ApiError> {
    let detail = state.controller.get_detail(&match_id).await?;
    Ok(ok(DetailView::from(&detail)))
}

async fn delete_scorecard(
    State(state): State<AppState>,
    Path((match_id, judge_id)): Path<(String, String)>,
) -> Result<Json<Success<StatusView>>, ApiError> {
    let judge: JudgeSeat = judge_id.parse().map_err(ValidationError::from)?;
    let status = state.controller.delete_scorecard(&match_id, judge).await?;
    Ok(ok(StatusView::from(&status)))
}

async fn reopen_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Success<StatusView>>, ApiError> {
    let status = state.controller.reopen_match(&match_id).await?;
    Ok(ok(StatusView::from(&status)))
}

async fn retry_report(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Success<SubmitView>>, ApiError> {
    let outcome = state.controller.retry_report(&match_id).await?;
    Ok(ok(SubmitView::from(outcome)))
}

#[derive(Debug, Serialize)]
pub struct MatchList {
    matches: Vec<StatusView>,
}

async fn tournament_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Success<MatchList>>, ApiError> {
    let statuses = state.controller.list_tournament(&tournament_id).await?;
    Ok(ok(MatchList {
        matches: statuses.iter().map(StatusView::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjudication::reporting::ReportError;
    use adjudication::state::StoreError;

    fn status_of(err: AdjudicationError) -> StatusCode {
        ApiError::from(err).status_code()
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            status_of(ValidationError::SameCompetitors.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AdjudicationError::NotFound("m1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AdjudicationError::AlreadyFinalized {
                match_id: "m1".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AdjudicationError::NotReady {
                match_id: "m1".into(),
                judge_count: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AdjudicationError::TiedMatch {
                match_id: "m1".into(),
                score_a: 6,
                score_b: 6
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ReportError::Transport("reset".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(StoreError::Backend("io".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::InvalidBody("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_failures_do_not_leak_details() {
        let err = ApiError::from(AdjudicationError::from(StoreError::Backend(
            "password authentication failed for user judge".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_result_view_uses_wire_names() {
        let result = MatchResult {
            winner: "101".into(),
            winner_side: adjudication::state::Side::A,
            win_method: WinMethod::Points,
            score_a: 19,
            score_b: 14,
            ko_votes: None,
            judges_counted: 3,
            decided_at: Utc::now(),
        };
        let json = serde_json::to_value(ResultView::from(&result)).unwrap();
        assert_eq!(json["winnerId"], "101");
        assert_eq!(json["winMethod"], "points");
        assert_eq!(json["scoreA"], 19);
        assert_eq!(json["scoreB"], 14);
        assert_eq!(json["scoresCsv"], "19-14");
        assert!(json.get("koVotes").is_none());
    }
}

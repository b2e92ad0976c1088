//! Challonge v1 bracket reporter
//!
//! Reports a decided match with
//! `PUT {base}/tournaments/{tournament}/matches/{match}.json` carrying
//! `match[scores_csv]` and `match[winner_id]`, and reopens one with
//! `POST {base}/tournaments/{tournament}/matches/{match}/reopen.json`.
//! The API key travels as the `api_key` query parameter. Ids are
//! percent-encoded as single path segments.

use adjudication::reporting::{score_csv, BracketReporter, ReportError};
use adjudication::state::ExternalReceipt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ChallongeConfig;

/// Longest upstream error body kept in a [`ReportError::Rejected`]
const MAX_ERROR_BODY: usize = 512;

pub struct ChallongeReporter {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct MatchEnvelope {
    #[serde(rename = "match")]
    inner: HostMatch,
}

#[derive(Debug, Deserialize)]
struct HostMatch {
    id: Value,
    #[serde(default)]
    state: Option<String>,
}

impl ChallongeReporter {
    pub fn new(config: &ChallongeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid Challonge base URL {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Challonge base URL {} cannot carry a path", config.base_url);
        }

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// `{base}/tournaments/{tournament}/matches/{tail..}`
    fn match_url(&self, tournament_id: &str, tail: &[&str]) -> Result<Url, ReportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReportError::InvalidTarget(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["tournaments", tournament_id, "matches"])
            .extend(tail);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ReportError> {
        let response = request
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(ReportError::RateLimited { retry_after_secs });
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(ReportError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Reject ids that would not survive as one path segment
fn check_id(kind: &str, id: &str) -> Result<(), ReportError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ReportError::InvalidTarget(format!("{} id {:?}", kind, id)));
    }
    Ok(())
}

/// Challonge participant ids are integers; anything else is passed as text
fn winner_value(winner: &str) -> Value {
    match winner.parse::<u64>() {
        Ok(id) => json!(id),
        Err(_) => json!(winner),
    }
}

#[async_trait]
impl BracketReporter for ChallongeReporter {
    fn name(&self) -> &'static str {
        "challonge"
    }

    async fn report_result(
        &self,
        tournament_id: &str,
        match_id: &str,
        winner: &str,
        score_a: u32,
        score_b: u32,
    ) -> Result<ExternalReceipt, ReportError> {
        check_id("tournament", tournament_id)?;
        check_id("match", match_id)?;
        let url = self.match_url(tournament_id, &[format!("{}.json", match_id).as_str()])?;
        let body = json!({
            "match": {
                "scores_csv": score_csv(score_a, score_b),
                "winner_id": winner_value(winner),
            }
        });
        debug!(%url, %body, "Reporting match result");

        let response = self
            .send(self.http.put(url).json(&body))
            .await
            .inspect_err(|e| warn!(tournament_id, match_id, error = %e, "Challonge update failed"))?;

        let envelope: MatchEnvelope = response
            .json()
            .await
            .map_err(|e| ReportError::Malformed(e.to_string()))?;

        let reference = match envelope.inner.id {
            Value::String(id) => id,
            other => other.to_string(),
        };

        Ok(ExternalReceipt {
            reference,
            state: envelope.inner.state,
            reported_at: Utc::now(),
        })
    }

    async fn reopen_match(&self, tournament_id: &str, match_id: &str) -> Result<(), ReportError> {
        check_id("tournament", tournament_id)?;
        check_id("match", match_id)?;
        let url = self.match_url(tournament_id, &[match_id, "reopen.json"])?;
        self.send(self.http.post(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::{post, put};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct FakeHost {
        calls: Arc<Mutex<Vec<(String, String, Value)>>>,
    }

    async fn update_match(
        State(host): State<FakeHost>,
        Path((tournament, file)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> axum::response::Response {
        if query.get("api_key").map(String::as_str) != Some("test-key") {
            return (AxumStatus::UNAUTHORIZED, "bad key").into_response();
        }
        match tournament.as_str() {
            "busy" => {
                return (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down")
                    .into_response()
            }
            "closed" => {
                return (AxumStatus::UNPROCESSABLE_ENTITY, "Tournament is complete").into_response()
            }
            _ => {}
        }

        let match_id = file.trim_end_matches(".json").to_string();
        host.calls
            .lock()
            .unwrap()
            .push((tournament, match_id.clone(), body));
        Json(json!({"match": {"id": match_id.parse::<u64>().unwrap_or(0), "state": "complete"}}))
            .into_response()
    }

    async fn reopen(
        State(host): State<FakeHost>,
        Path((tournament, match_id)): Path<(String, String)>,
    ) -> Json<Value> {
        host.calls
            .lock()
            .unwrap()
            .push((tournament, match_id.clone(), json!("reopen")));
        Json(json!({"match": {"id": 1, "state": "open"}}))
    }

    async fn start_fake_host() -> (String, FakeHost) {
        let host = FakeHost::default();
        let app = Router::new()
            .route("/v1/tournaments/:tournament/matches/:file", put(update_match))
            .route(
                "/v1/tournaments/:tournament/matches/:file/reopen.json",
                post(reopen),
            )
            .with_state(host.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), host)
    }

    fn reporter(base_url: &str) -> ChallongeReporter {
        ChallongeReporter::new(&ChallongeConfig {
            api_key: "test-key".to_string(),
            base_url: format!("{}/", base_url),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_report_result_sends_scores_and_winner() {
        let (base_url, host) = start_fake_host().await;
        let reporter = reporter(&base_url);

        let receipt = reporter
            .report_result("spring", "417", "101", 19, 14)
            .await
            .unwrap();
        assert_eq!(receipt.reference, "417");
        assert_eq!(receipt.state.as_deref(), Some("complete"));

        let calls = host.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let (tournament, match_id, body) = &calls[0];
        assert_eq!(tournament, "spring");
        assert_eq!(match_id, "417");
        assert_eq!(body["match"]["scores_csv"], "19-14");
        assert_eq!(body["match"]["winner_id"], 101);
    }

    #[tokio::test]
    async fn test_ids_with_path_characters_stay_in_one_segment() {
        let (base_url, host) = start_fake_host().await;
        let reporter = reporter(&base_url);

        let receipt = reporter
            .report_result("other/matches/999.json?x=", "417", "101", 19, 14)
            .await
            .unwrap();
        assert_eq!(receipt.reference, "417");

        reporter.reopen_match("spring", "5#frag").await.unwrap();

        let calls = host.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "other/matches/999.json?x=");
        assert_eq!(calls[0].1, "417");
        assert_eq!(calls[1].0, "spring");
        assert_eq!(calls[1].1, "5#frag");
    }

    #[tokio::test]
    async fn test_dot_segment_ids_are_refused() {
        let (base_url, host) = start_fake_host().await;
        let reporter = reporter(&base_url);

        let err = reporter
            .report_result("..", "417", "101", 19, 14)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidTarget(_)));
        assert!(!err.is_retryable());

        let err = reporter.reopen_match("spring", ".").await.unwrap_err();
        assert!(matches!(err, ReportError::InvalidTarget(_)));
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_winner_is_sent_as_text() {
        let (base_url, host) = start_fake_host().await;
        reporter(&base_url)
            .report_result("spring", "9", "red-corner", 33, 0)
            .await
            .unwrap();
        assert_eq!(host.calls.lock().unwrap()[0].2["match"]["winner_id"], "red-corner");
    }

    #[tokio::test]
    async fn test_upstream_errors_are_classified() {
        let (base_url, _host) = start_fake_host().await;
        let reporter = reporter(&base_url);

        let err = reporter
            .report_result("busy", "417", "101", 19, 14)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::RateLimited {
                retry_after_secs: Some(7)
            }
        );
        assert!(err.is_retryable());

        let err = reporter
            .report_result("closed", "417", "101", 19, 14)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Rejected { status: 422, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reporter(&format!("http://{}", addr))
            .report_result("spring", "417", "101", 19, 14)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reopen_posts_to_reopen_endpoint() {
        let (base_url, host) = start_fake_host().await;
        reporter(&base_url).reopen_match("spring", "417").await.unwrap();

        let calls = host.calls.lock().unwrap().clone();
        assert_eq!(calls[0].0, "spring");
        assert_eq!(calls[0].1, "417");
        assert_eq!(calls[0].2, json!("reopen"));
    }
}

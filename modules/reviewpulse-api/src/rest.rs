use std::sync::Arc;

use apify_client::{RawReview, ReviewSort};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use reviewpulse_common::{CleanedReview, ReviewPulseError, SentimentLabel};
use reviewpulse_pipeline::{cleaner, AnalysisFilter, ScrapeOptions};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::AppState;

// --- Request structs ---

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeRequest {
    pub place_url: String,
    #[serde(default = "default_max_reviews")]
    pub max_reviews: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub sort_by: ReviewSort,
    #[serde(default = "default_true")]
    pub analyze: bool,
}

impl ScrapeRequest {
    fn options(&self) -> ScrapeOptions {
        ScrapeOptions {
            max_reviews: self.max_reviews,
            language: self.language.clone(),
            sort_by: self.sort_by,
            analyze: self.analyze,
        }
    }

    fn validate(&self) -> Option<&'static str> {
        if self.place_url.trim().is_empty() {
            return Some("place_url must not be empty");
        }
        if self.max_reviews == 0 {
            return Some("max_reviews must be at least 1");
        }
        None
    }
}

#[derive(Debug, Deserialize)]
pub struct MultipleScrapeRequest {
    pub place_urls: Vec<String>,
    #[serde(default = "default_max_reviews")]
    pub max_reviews_per_location: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub sort_by: ReviewSort,
    #[serde(default = "default_true")]
    pub analyze: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub reviews: Vec<CleanedReview>,
    #[serde(default)]
    pub force_reanalyze: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalysesQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    sentiment: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

fn default_max_reviews() -> u32 {
    50
}

fn default_language() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

// --- Helpers ---

fn error_json(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn pipeline_error_response(e: ReviewPulseError) -> axum::response::Response {
    match e {
        ReviewPulseError::Validation(msg) => error_json(StatusCode::BAD_REQUEST, msg),
        ReviewPulseError::Scraping(msg) => {
            warn!(error = %msg, "Upstream scrape failed");
            error_json(StatusCode::BAD_GATEWAY, msg)
        }
        other => {
            error!(error = %other, "Scrape pipeline failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// --- Handlers ---

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "ReviewPulse API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "scrape": "POST /api/scrape",
            "scrape_multiple": "POST /api/scrape/multiple",
            "scrape_async": "POST /api/scrape/async",
            "job_status": "GET /api/jobs/{job_id}",
            "job_stats": "GET /api/jobs",
            "clean_reviews": "POST /api/reviews/clean",
            "analyze_reviews": "POST /api/reviews/analyze",
            "analyses": "GET /api/analyses",
            "analysis": "GET /api/analyses/{id}",
            "statistics": "GET /api/statistics",
            "health": "GET /health",
        }
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_healthy = match state.pipeline.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(serde_json::json!({
        "status": if db_healthy { "healthy" } else { "degraded" },
        "database_available": db_healthy,
        "model_available": state.pipeline.analyzer().model_configured(),
        "fallback_available": true,
        "timestamp": Utc::now(),
    }))
}

/// Synchronous scrape of a single place.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> impl IntoResponse {
    if let Some(msg) = request.validate() {
        return error_json(StatusCode::BAD_REQUEST, msg);
    }

    match state
        .pipeline
        .process_location(&request.place_url, &request.options())
        .await
    {
        Ok(report) => Json(serde_json::json!({ "success": true, "report": report })).into_response(),
        Err(e) => pipeline_error_response(e),
    }
}

/// Synchronous scrape of several places, sequential with a pause between.
pub async fn scrape_multiple(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MultipleScrapeRequest>,
) -> impl IntoResponse {
    if request.place_urls.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "place_urls must not be empty");
    }
    if request.max_reviews_per_location == 0 {
        return error_json(StatusCode::BAD_REQUEST, "max_reviews_per_location must be at least 1");
    }

    let opts = ScrapeOptions {
        max_reviews: request.max_reviews_per_location,
        language: request.language.clone(),
        sort_by: request.sort_by,
        analyze: request.analyze,
    };

    let results = state.pipeline.process_locations(&request.place_urls, &opts).await;

    Json(serde_json::json!({
        "success": true,
        "total_locations": request.place_urls.len(),
        "results": results,
        "timestamp": Utc::now(),
    }))
    .into_response()
}

/// Asynchronous scrape: registers a job and returns its id immediately.
pub async fn scrape_async(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> impl IntoResponse {
    if let Some(msg) = request.validate() {
        return error_json(StatusCode::BAD_REQUEST, msg);
    }

    let job_id = state.jobs.create().await;
    tokio::spawn(run_scrape_job(state.clone(), job_id, request));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "job_id": job_id,
            "status": "pending",
            "message": "Job started. Check status at /api/jobs/{job_id}",
        })),
    )
        .into_response()
}

async fn run_scrape_job(state: Arc<AppState>, job_id: Uuid, request: ScrapeRequest) {
    state.jobs.set_progress(job_id, "scraping", 30).await;

    match state
        .pipeline
        .process_location(&request.place_url, &request.options())
        .await
    {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(value) => state.jobs.complete(job_id, value).await,
            Err(e) => {
                error!(%job_id, error = %e, "Failed to serialize job result");
                state.jobs.fail(job_id, e.to_string()).await;
            }
        },
        Err(e) => {
            error!(%job_id, error = %e, "Scrape job failed");
            state.jobs.fail(job_id, e.to_string()).await;
        }
    }
}

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.jobs.get(job_id).await {
        Some(job) => Json(job).into_response(),
        None => error_json(StatusCode::NOT_FOUND, "Job not found"),
    }
}

pub async fn job_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.jobs.counts().await)
}

/// Standalone cleaning endpoint, useful for testing raw scrape dumps.
pub async fn clean_reviews(Json(reviews): Json<Vec<RawReview>>) -> impl IntoResponse {
    let (valid_reviews, stats) = cleaner::filter_reviews(reviews);
    Json(serde_json::json!({
        "success": true,
        "valid_reviews": valid_reviews,
        "stats": stats,
    }))
}

/// Classify already-cleaned reviews without scraping. Stored results are
/// reused for unchanged texts unless `force_reanalyze` is set.
pub async fn analyze_reviews(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    if request.reviews.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "reviews must not be empty");
    }

    let outcome = state
        .pipeline
        .classify_and_store(&request.reviews, request.force_reanalyze)
        .await;

    Json(serde_json::json!({ "success": true, "outcome": outcome })).into_response()
}

pub async fn analyses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalysesQuery>,
) -> impl IntoResponse {
    let sentiment = match params.sentiment.as_deref() {
        None => None,
        Some(s) => match SentimentLabel::parse(s) {
            Some(label) => Some(label),
            None => {
                return error_json(
                    StatusCode::BAD_REQUEST,
                    "sentiment must be Positive, Neutral or Negative",
                )
            }
        },
    };

    let filter = AnalysisFilter {
        limit: params.limit.unwrap_or(100).clamp(1, 500),
        offset: params.offset.unwrap_or(0).max(0),
        sentiment,
        start_date: params
            .start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
        end_date: params
            .end_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc()),
    };

    match state.pipeline.store().list(&filter).await {
        Ok(page) => Json(serde_json::json!({
            "success": true,
            "summary": page.summary,
            "results": page.results,
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list analyses");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list analyses")
        }
    }
}

pub async fn analysis_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.pipeline.store().get(&id).await {
        Ok(Some(analysis)) => Json(analysis).into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "Analysis not found"),
        Err(e) => {
            warn!(error = %e, "Failed to load analysis");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load analysis")
        }
    }
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.store().statistics().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to compute statistics");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to compute statistics")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_request_applies_defaults() {
        let request: ScrapeRequest =
            serde_json::from_str(r#"{"place_url": "https://maps.google.com/?cid=1"}"#).unwrap();
        assert_eq!(request.max_reviews, 50);
        assert_eq!(request.language, "id");
        assert_eq!(request.sort_by, ReviewSort::Newest);
        assert!(request.analyze);
        assert!(request.validate().is_none());
    }

    #[test]
    fn scrape_request_rejects_empty_url() {
        let request: ScrapeRequest = serde_json::from_str(r#"{"place_url": "  "}"#).unwrap();
        assert!(request.validate().is_some());
    }

    #[test]
    fn scrape_request_rejects_zero_reviews() {
        let request: ScrapeRequest =
            serde_json::from_str(r#"{"place_url": "https://x", "max_reviews": 0}"#).unwrap();
        assert!(request.validate().is_some());
    }

    #[test]
    fn analyze_request_defaults_to_reusing_stored_results() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"reviews": [{"id": "r1", "text": "Bagus", "rating": 5}]}"#,
        )
        .unwrap();
        assert!(!request.force_reanalyze);
        assert_eq!(request.reviews.len(), 1);
        assert_eq!(request.reviews[0].likes_count, 0);

        let forced: AnalyzeRequest =
            serde_json::from_str(r#"{"reviews": [], "force_reanalyze": true}"#).unwrap();
        assert!(forced.force_reanalyze);
    }

    #[test]
    fn sort_by_parses_actor_values() {
        let request: ScrapeRequest = serde_json::from_str(
            r#"{"place_url": "https://x", "sort_by": "mostRelevant"}"#,
        )
        .unwrap();
        assert_eq!(request.sort_by, ReviewSort::MostRelevant);
    }
}

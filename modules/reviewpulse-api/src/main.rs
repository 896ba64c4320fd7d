use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::ChatClient;
use apify_client::ApifyClient;
use reviewpulse_common::Config;
use reviewpulse_pipeline::{DedupTracker, ReviewPipeline, SentimentAnalyzer, SentimentStore};

mod jobs;
mod rest;

use jobs::JobTracker;

pub struct AppState {
    pub pipeline: Arc<ReviewPipeline>,
    pub jobs: JobTracker,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("reviewpulse_api=info".parse()?)
                .add_directive("reviewpulse_pipeline=info".parse()?),
        )
        .init();

    let config = Config::from_env();

    let store = SentimentStore::connect(&config.database_url).await?;
    store.init_schema().await?;

    let chat_client = config.github_token.clone().map(|token| {
        ChatClient::new(token, config.github_model.clone())
            .with_base_url(config.github_endpoint.clone())
    });
    if chat_client.is_none() {
        info!("GITHUB_TOKEN not set, sentiment analysis will use the rule-based fallback");
    }

    let pipeline = Arc::new(ReviewPipeline::new(
        ApifyClient::new(config.apify_token.clone()),
        SentimentAnalyzer::new(chat_client),
        store,
        DedupTracker::load(&config.review_cache_path),
    ));

    let state = Arc::new(AppState {
        pipeline,
        jobs: JobTracker::default(),
    });

    let app = Router::new()
        // Health check
        .route("/", get(rest::root))
        .route("/health", get(rest::health))
        // Scraping
        .route("/api/scrape", post(rest::scrape))
        .route("/api/scrape/multiple", post(rest::scrape_multiple))
        .route("/api/scrape/async", post(rest::scrape_async))
        // Jobs
        .route("/api/jobs", get(rest::job_stats))
        .route("/api/jobs/{job_id}", get(rest::job_status))
        // Cleaning and standalone analysis
        .route("/api/reviews/clean", post(rest::clean_reviews))
        .route("/api/reviews/analyze", post(rest::analyze_reviews))
        // Persisted analyses
        .route("/api/analyses", get(rest::analyses))
        .route("/api/analyses/{id}", get(rest::analysis_detail))
        .route("/api/statistics", get(rest::statistics))
        .with_state(state)
        // CORS: the dashboard frontend runs on its own origin
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path only (no query params)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("ReviewPulse API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

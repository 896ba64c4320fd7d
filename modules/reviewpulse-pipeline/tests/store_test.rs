//! Integration tests for the Postgres sentiment store.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use apify_client::ApifyClient;
use chrono::Utc;
use reviewpulse_common::{CleanedReview, SentimentAnalysis, SentimentLabel};
use reviewpulse_pipeline::{
    AnalysisFilter, DedupTracker, ReviewPipeline, SentimentAnalyzer, SentimentStore,
};

async fn test_store() -> Option<SentimentStore> {
    let url = match std::env::var("DATABASE_TEST_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("DATABASE_TEST_URL not set, skipping store test");
            return None;
        }
    };
    let store = SentimentStore::connect(&url)
        .await
        .expect("connect to test database");
    store.init_schema().await.expect("init schema");
    Some(store)
}

fn analysis(id: &str, sentiment: SentimentLabel, score: f64) -> SentimentAnalysis {
    SentimentAnalysis {
        id: id.to_string(),
        review_text: format!("review body for {id}"),
        rating: 4,
        reviewer_name: Some("Budi".to_string()),
        review_at: Some(Utc::now()),
        sentiment,
        sentiment_score: score,
        themes: vec!["Kualitas Pelayanan".to_string()],
        analysis_reasons: vec!["a".into(), "b".into(), "c".into()],
        ai_suggestions: vec!["x".into(), "y".into(), "z".into()],
        processing_time_ms: 12.5,
        source: "hosted_model".to_string(),
        analyzed_at: None,
    }
}

#[tokio::test]
async fn upsert_get_round_trip() {
    let Some(store) = test_store().await else { return };

    let record = analysis("test-roundtrip-1", SentimentLabel::Positive, 0.8);
    store.upsert(&record).await.expect("upsert");

    let fetched = store
        .get("test-roundtrip-1")
        .await
        .expect("get")
        .expect("record exists");
    assert_eq!(fetched.review_text, record.review_text);
    assert_eq!(fetched.sentiment, SentimentLabel::Positive);
    assert_eq!(fetched.themes, record.themes);
    assert!(fetched.analyzed_at.is_some());
}

#[tokio::test]
async fn upsert_replaces_existing_row() {
    let Some(store) = test_store().await else { return };

    store
        .upsert(&analysis("test-upsert-1", SentimentLabel::Neutral, 0.0))
        .await
        .expect("first upsert");

    let mut updated = analysis("test-upsert-1", SentimentLabel::Negative, -0.6);
    updated.review_text = "edited review".to_string();
    store.upsert(&updated).await.expect("second upsert");

    let fetched = store.get("test-upsert-1").await.unwrap().unwrap();
    assert_eq!(fetched.sentiment, SentimentLabel::Negative);
    assert_eq!(fetched.review_text, "edited review");
}

#[tokio::test]
async fn is_analyzed_requires_matching_text() {
    let Some(store) = test_store().await else { return };

    let record = analysis("test-analyzed-1", SentimentLabel::Positive, 0.5);
    store.upsert(&record).await.expect("upsert");

    assert!(store
        .is_analyzed("test-analyzed-1", &record.review_text)
        .await
        .unwrap());
    assert!(!store
        .is_analyzed("test-analyzed-1", "different text")
        .await
        .unwrap());
    assert!(!store
        .is_analyzed("test-analyzed-missing", &record.review_text)
        .await
        .unwrap());
}

#[tokio::test]
async fn list_filters_by_sentiment() {
    let Some(store) = test_store().await else { return };

    store
        .upsert(&analysis("test-list-pos", SentimentLabel::Positive, 0.9))
        .await
        .unwrap();
    store
        .upsert(&analysis("test-list-neg", SentimentLabel::Negative, -0.9))
        .await
        .unwrap();

    let page = store
        .list(&AnalysisFilter {
            limit: 100,
            offset: 0,
            sentiment: Some(SentimentLabel::Negative),
            start_date: None,
            end_date: None,
        })
        .await
        .expect("list");

    assert!(page
        .results
        .iter()
        .all(|a| a.sentiment == SentimentLabel::Negative));
    assert_eq!(page.summary.positive_count, 0);
    assert!(page.summary.negative_count >= 1);
}

#[tokio::test]
async fn force_reanalyze_bypasses_stored_results() {
    let Some(store) = test_store().await else { return };

    let cache = tempfile::NamedTempFile::new().expect("temp cache file");
    let pipeline = ReviewPipeline::new(
        ApifyClient::new("unused".to_string()),
        SentimentAnalyzer::new(None),
        store,
        DedupTracker::load(cache.path()),
    );

    let review = CleanedReview {
        id: "test-force-1".to_string(),
        text: "Pelayanan bagus dan staff ramah".to_string(),
        rating: 5,
        reviewer_name: None,
        published_at: None,
        likes_count: 0,
    };
    let batch = std::slice::from_ref(&review);

    // First pass classifies and persists.
    let first = pipeline.classify_and_store(batch, false).await;
    assert_eq!(first.newly_analyzed, 1);
    assert_eq!(first.from_cache, 0);
    assert!(first.results.iter().all(|r| !r.from_cache));

    // Unchanged text is served from the store.
    let second = pipeline.classify_and_store(batch, false).await;
    assert_eq!(second.newly_analyzed, 0);
    assert_eq!(second.from_cache, 1);
    assert!(second.results.iter().all(|r| r.from_cache));
    assert_eq!(second.skipped[0].reason, "already_analyzed");

    // Forcing reruns the classifier even for unchanged text.
    let forced = pipeline.classify_and_store(batch, true).await;
    assert_eq!(forced.newly_analyzed, 1);
    assert_eq!(forced.from_cache, 0);
    assert!(forced.results.iter().all(|r| !r.from_cache));
}

#[tokio::test]
async fn statistics_reports_distribution() {
    let Some(store) = test_store().await else { return };

    store
        .upsert(&analysis("test-stats-1", SentimentLabel::Positive, 0.7))
        .await
        .unwrap();

    let stats = store.statistics().await.expect("statistics");
    assert!(stats.total_reviews >= 1);
    let spread = stats.sentiment_distribution.positive
        + stats.sentiment_distribution.neutral
        + stats.sentiment_distribution.negative;
    assert!(spread <= 100.1);
}

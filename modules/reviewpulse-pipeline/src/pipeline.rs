//! Scrape → dedup → clean → classify → persist, one place at a time.

use std::time::{Duration, Instant};

use apify_client::{ApifyClient, ReviewSort};
use chrono::{DateTime, Utc};
use reviewpulse_common::{
    CleanedReview, CleaningStats, PlaceSummary, ReviewPulseError, ScrapingStats, SentimentAnalysis,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::dedup::DedupTracker;
use crate::sentiment::SentimentAnalyzer;
use crate::store::SentimentStore;
use crate::cleaner;

/// Pause between consecutive place scrapes, to stay polite with Apify.
const PLACE_SCRAPE_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub max_reviews: u32,
    pub language: String,
    pub sort_by: ReviewSort,
    pub analyze: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            max_reviews: 50,
            language: "id".to_string(),
            sort_by: ReviewSort::Newest,
            analyze: true,
        }
    }
}

/// Outcome of a smart batch classification run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub total_reviews: usize,
    pub processed: usize,
    pub newly_analyzed: usize,
    pub from_cache: usize,
    pub failed: usize,
    pub processing_time_total_ms: f64,
    pub results: Vec<ClassifiedReview>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedReview>,
}

/// One entry in a batch outcome: the analysis, plus whether it was served
/// from the store instead of being classified on this run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedReview {
    #[serde(flatten)]
    pub analysis: SentimentAnalysis,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedReview {
    pub id: String,
    pub reason: &'static str,
}

/// Full report for one processed place.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub location: PlaceSummary,
    pub reviews: Vec<CleanedReview>,
    pub cleaning_stats: CleaningStats,
    pub scraping_stats: ScrapingStats,
    pub analyzed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_analysis: Option<BatchOutcome>,
    pub timestamp: DateTime<Utc>,
}

/// Per-place entry in a multi-location response.
#[derive(Debug, Serialize)]
pub struct LocationOutcome {
    pub place_url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<LocationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ReviewPipeline {
    apify: ApifyClient,
    analyzer: SentimentAnalyzer,
    store: SentimentStore,
    dedup: Mutex<DedupTracker>,
}

impl ReviewPipeline {
    pub fn new(
        apify: ApifyClient,
        analyzer: SentimentAnalyzer,
        store: SentimentStore,
        dedup: DedupTracker,
    ) -> Self {
        Self {
            apify,
            analyzer,
            store,
            dedup: Mutex::new(dedup),
        }
    }

    pub fn store(&self) -> &SentimentStore {
        &self.store
    }

    pub fn analyzer(&self) -> &SentimentAnalyzer {
        &self.analyzer
    }

    /// Process a single place end-to-end.
    pub async fn process_location(
        &self,
        place_url: &str,
        opts: &ScrapeOptions,
    ) -> Result<LocationReport, ReviewPulseError> {
        let places = self
            .apify
            .scrape_place_reviews(place_url, opts.max_reviews, &opts.language, opts.sort_by)
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Err(ReviewPulseError::Scraping("No data found for place".into()));
        };

        let raw_count = place.reviews.len();
        let location = PlaceSummary::from(&place);

        // Drop reviews already seen in earlier scrapes of this place.
        let (new_reviews, total_tracked) = match &place.place_id {
            Some(place_id) => {
                let mut dedup = self.dedup.lock().await;
                let fresh = dedup.filter_new(place_id, place.reviews);
                dedup.persist();
                (fresh, dedup.seen_count(place_id))
            }
            None => {
                warn!(place_url, "Place has no placeId, skipping dedup filter");
                (place.reviews, 0)
            }
        };
        let new_count = new_reviews.len();

        let (cleaned, cleaning_stats) = cleaner::filter_reviews(new_reviews);
        info!(
            place_url,
            raw = raw_count,
            new = new_count,
            valid = cleaning_stats.valid,
            "Scrape cleaned"
        );

        let sentiment_analysis = if opts.analyze && !cleaned.is_empty() {
            Some(self.classify_and_store(&cleaned, false).await)
        } else {
            None
        };

        Ok(LocationReport {
            location,
            analyzed: sentiment_analysis.is_some(),
            sentiment_analysis,
            reviews: cleaned,
            cleaning_stats,
            scraping_stats: ScrapingStats {
                raw_reviews_fetched: raw_count,
                duplicates_filtered: raw_count - new_count,
                new_reviews_found: new_count,
                total_scraped_for_place: total_tracked,
            },
            timestamp: Utc::now(),
        })
    }

    /// Process several places sequentially with a pause between scrapes.
    /// Failures are captured per place instead of aborting the batch.
    pub async fn process_locations(
        &self,
        place_urls: &[String],
        opts: &ScrapeOptions,
    ) -> Vec<LocationOutcome> {
        let mut outcomes = Vec::with_capacity(place_urls.len());
        for (idx, url) in place_urls.iter().enumerate() {
            let outcome = match self.process_location(url, opts).await {
                Ok(report) => LocationOutcome {
                    place_url: url.clone(),
                    success: true,
                    report: Some(report),
                    error: None,
                },
                Err(e) => {
                    warn!(place_url = %url, error = %e, "Location scrape failed");
                    LocationOutcome {
                        place_url: url.clone(),
                        success: false,
                        report: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);

            if idx + 1 < place_urls.len() {
                tokio::time::sleep(PLACE_SCRAPE_PAUSE).await;
            }
        }
        outcomes
    }

    /// Classify reviews and persist the results, skipping reviews whose
    /// identical text is already stored (unless `force_reanalyze`).
    pub async fn classify_and_store(
        &self,
        reviews: &[CleanedReview],
        force_reanalyze: bool,
    ) -> BatchOutcome {
        let started = Instant::now();
        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = 0;
        let mut to_analyze = Vec::new();

        for review in reviews {
            if !force_reanalyze {
                match self.store.is_analyzed(&review.id, &review.text).await {
                    Ok(true) => match self.store.get(&review.id).await {
                        Ok(Some(existing)) => {
                            results.push(ClassifiedReview {
                                analysis: existing,
                                from_cache: true,
                            });
                            skipped.push(SkippedReview {
                                id: review.id.clone(),
                                reason: "already_analyzed",
                            });
                            continue;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(review_id = %review.id, error = %e, "Cache lookup failed, re-analyzing");
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        warn!(review_id = %review.id, error = %e, "Analyzed check failed, re-analyzing");
                    }
                }
            }
            to_analyze.push(review.clone());
        }

        let newly_analyzed = to_analyze.len();
        let analyses = self.analyzer.analyze_batch(&to_analyze).await;

        for analysis in analyses {
            if let Err(e) = self.store.upsert(&analysis).await {
                warn!(review_id = %analysis.id, error = %e, "Failed to persist analysis");
                failed += 1;
            }
            results.push(ClassifiedReview {
                analysis,
                from_cache: false,
            });
        }

        BatchOutcome {
            total_reviews: reviews.len(),
            processed: results.len(),
            newly_analyzed,
            from_cache: skipped.len(),
            failed,
            processing_time_total_ms: started.elapsed().as_secs_f64() * 1000.0,
            results,
            skipped,
        }
    }
}

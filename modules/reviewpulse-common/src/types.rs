use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(SentimentLabel::Positive),
            "Neutral" => Some(SentimentLabel::Neutral),
            "Negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A review that passed cleaning and is ready for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedReview {
    pub id: String,
    pub text: String,
    pub rating: i32,
    pub reviewer_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes_count: i64,
}

/// Counters from a cleaning pass over raw scrape output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningStats {
    pub total: usize,
    pub valid: usize,
    pub no_text: usize,
    pub only_images: usize,
    pub too_short: usize,
}

/// Counters from one place scrape, after dedup filtering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapingStats {
    pub raw_reviews_fetched: usize,
    pub duplicates_filtered: usize,
    pub new_reviews_found: usize,
    pub total_scraped_for_place: usize,
}

/// Location metadata from the scraped place.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceSummary {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<i64>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub place_id: Option<String>,
    pub location: Option<apify_client::GeoPoint>,
}

impl From<&apify_client::PlaceResult> for PlaceSummary {
    fn from(place: &apify_client::PlaceResult) -> Self {
        Self {
            name: place.title.clone(),
            address: place.address.clone(),
            rating: place.total_score,
            reviews_count: place.reviews_count,
            category: place.category_name.clone(),
            phone: place.phone.clone(),
            website: place.website.clone(),
            place_id: place.place_id.clone(),
            location: place.location,
        }
    }
}

/// A fully classified review, the unit persisted to Postgres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub id: String,
    pub review_text: String,
    pub rating: i32,
    pub reviewer_name: Option<String>,
    pub review_at: Option<DateTime<Utc>>,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    pub themes: Vec<String>,
    pub analysis_reasons: Vec<String>,
    pub ai_suggestions: Vec<String>,
    pub processing_time_ms: f64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Metadata for an actor run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
}

/// A start URL entry for actor input.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Review sort order accepted by the Google Maps scraper actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReviewSort {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "mostRelevant")]
    MostRelevant,
    #[serde(rename = "highestRanking")]
    HighestRanking,
    #[serde(rename = "lowestRanking")]
    LowestRanking,
}

/// Input for the compass/crawler-google-places actor.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewsScraperInput {
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    #[serde(rename = "maxReviews")]
    pub max_reviews: u32,
    pub language: String,
    #[serde(rename = "sortBy")]
    pub sort_by: ReviewSort,
    #[serde(rename = "includeHistogram")]
    pub include_histogram: bool,
    #[serde(rename = "includeOpeningHours")]
    pub include_opening_hours: bool,
    #[serde(rename = "includePeopleAlsoSearch")]
    pub include_people_also_search: bool,
}

impl ReviewsScraperInput {
    pub fn for_place(place_url: &str, max_reviews: u32, language: &str, sort_by: ReviewSort) -> Self {
        Self {
            start_urls: vec![StartUrl {
                url: place_url.to_string(),
            }],
            max_reviews,
            language: language.to_string(),
            sort_by,
            include_histogram: true,
            include_opening_hours: true,
            include_people_also_search: false,
        }
    }
}

/// Lat/lng pair as reported by the actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One place from the actor's dataset: location metadata plus its reviews.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceResult {
    pub title: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "totalScore")]
    pub total_score: Option<f64>,
    #[serde(rename = "reviewsCount")]
    pub reviews_count: Option<i64>,
    #[serde(rename = "categoryName")]
    pub category_name: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "placeId")]
    pub place_id: Option<String>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub reviews: Vec<RawReview>,
}

/// A single Google Maps review as scraped by the actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(rename = "reviewId")]
    pub review_id: Option<String>,
    #[serde(rename = "reviewerId")]
    pub reviewer_id: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "textTranslated")]
    pub text_translated: Option<String>,
    pub stars: Option<i32>,
    #[serde(rename = "publishedAtDate")]
    pub published_at_date: Option<DateTime<Utc>>,
    #[serde(rename = "likesCount")]
    pub likes_count: Option<i64>,
    #[serde(rename = "reviewImageUrls", default)]
    pub review_image_urls: Vec<String>,
}

impl RawReview {
    /// Review body, preferring the original text over Google's translation.
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.text_translated.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_serializes_with_actor_field_names() {
        let input = ReviewsScraperInput::for_place(
            "https://maps.google.com/?cid=123",
            50,
            "id",
            ReviewSort::Newest,
        );
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["startUrls"][0]["url"], "https://maps.google.com/?cid=123");
        assert_eq!(json["maxReviews"], 50);
        assert_eq!(json["sortBy"], "newest");
        assert_eq!(json["includePeopleAlsoSearch"], false);
    }

    #[test]
    fn body_falls_back_to_translation() {
        let review = RawReview {
            review_id: None,
            reviewer_id: None,
            name: None,
            text: Some("   ".into()),
            text_translated: Some("Great service".into()),
            stars: Some(5),
            published_at_date: None,
            likes_count: None,
            review_image_urls: vec![],
        };
        assert_eq!(review.body(), "Great service");
    }

    #[test]
    fn place_result_parses_dataset_item() {
        let item = serde_json::json!({
            "title": "AHASS Cahaya Motor",
            "address": "Jl. Raya 1",
            "totalScore": 4.4,
            "reviewsCount": 213,
            "categoryName": "Motorcycle repair shop",
            "placeId": "ChIJabc",
            "location": {"lat": -6.2, "lng": 106.8},
            "reviews": [
                {"reviewId": "r1", "text": "Pelayanan cepat", "stars": 5}
            ]
        });
        let place: PlaceResult = serde_json::from_value(item).unwrap();
        assert_eq!(place.place_id.as_deref(), Some("ChIJabc"));
        assert_eq!(place.reviews.len(), 1);
        assert_eq!(place.reviews[0].body(), "Pelayanan cepat");
    }
}

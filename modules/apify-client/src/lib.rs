pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    GeoPoint, PlaceResult, RawReview, ReviewSort, ReviewsScraperInput, RunData, StartUrl,
};

use serde::de::DeserializeOwned;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for compass/crawler-google-places.
const GOOGLE_PLACES_SCRAPER: &str = "nwua9Gu5YrADL7ZDj";

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start a Google Maps reviews scrape run. Returns immediately with run metadata.
    pub async fn start_reviews_scrape(&self, input: &ReviewsScraperInput) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, GOOGLE_PLACES_SCRAPER);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Scrape a place's reviews end-to-end: start run, poll, fetch results.
    /// Each dataset item is one place with its reviews attached.
    pub async fn scrape_place_reviews(
        &self,
        place_url: &str,
        max_reviews: u32,
        language: &str,
        sort_by: ReviewSort,
    ) -> Result<Vec<PlaceResult>> {
        tracing::info!(place_url, max_reviews, "Starting Google Maps reviews scrape");

        let input = ReviewsScraperInput::for_place(place_url, max_reviews, language, sort_by);
        let run = self.start_reviews_scrape(&input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let places: Vec<PlaceResult> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        if places.is_empty() {
            return Err(ApifyError::EmptyDataset);
        }
        tracing::info!(count = places.len(), "Fetched place results");

        Ok(places)
    }
}

//! Review cleaning and validation before sentiment analysis.
//!
//! Google Maps scrape output is noisy: image-only reviews, empty bodies,
//! and Google Translate artifacts. Everything that survives this pass is
//! worth spending a model call on.

use apify_client::RawReview;
use reviewpulse_common::{CleanedReview, CleaningStats};
use uuid::Uuid;

/// Minimum trimmed length for a review body to count as meaningful text.
const MIN_TEXT_CHARS: usize = 3;

/// Default star rating when the scraper did not report one.
const DEFAULT_RATING: i32 = 3;

/// Normalize a review body: collapse whitespace runs and drop Google
/// Translate artifacts.
pub fn clean_text(text: &str) -> String {
    let text = text
        .replace("(Translated by Google)", " ")
        .replace("(Original)", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a review carries enough text to analyze.
pub fn is_valid_review(review: &RawReview) -> bool {
    review.body().trim().chars().count() >= MIN_TEXT_CHARS
}

/// Whether a review is photos-only (images attached, no usable text).
pub fn has_only_images(review: &RawReview) -> bool {
    !review.review_image_urls.is_empty() && !is_valid_review(review)
}

/// Filter a raw scrape batch down to analyzable reviews, tallying why each
/// rejected review was dropped.
pub fn filter_reviews(reviews: Vec<RawReview>) -> (Vec<CleanedReview>, CleaningStats) {
    let mut stats = CleaningStats {
        total: reviews.len(),
        ..Default::default()
    };
    let mut valid = Vec::new();

    for review in reviews {
        if has_only_images(&review) {
            stats.only_images += 1;
            continue;
        }

        let text = review.body().trim();
        if text.is_empty() {
            stats.no_text += 1;
            continue;
        }
        if text.chars().count() < MIN_TEXT_CHARS {
            stats.too_short += 1;
            continue;
        }

        let id = review
            .review_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        valid.push(CleanedReview {
            id,
            text: clean_text(text),
            rating: review.stars.unwrap_or(DEFAULT_RATING),
            reviewer_name: review.name.clone(),
            published_at: review.published_at_date,
            likes_count: review.likes_count.unwrap_or(0),
        });
        stats.valid += 1;
    }

    (valid, stats)
}

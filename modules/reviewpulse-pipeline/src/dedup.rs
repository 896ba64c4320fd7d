//! Per-place tracking of already-scraped reviews.
//!
//! Apify bills per result, and re-running a place re-fetches the same recent
//! reviews. The tracker keeps a fingerprint set per place, persisted to a
//! JSON cache file so the filter survives restarts.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use apify_client::RawReview;
use tracing::warn;

pub struct DedupTracker {
    path: PathBuf,
    seen: HashMap<String, HashSet<String>>,
}

impl DedupTracker {
    /// Load the tracker from a cache file. A missing or corrupt file starts
    /// an empty tracker.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let seen = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, Vec<String>>>(&contents) {
                Ok(map) => map
                    .into_iter()
                    .map(|(k, v)| (k, v.into_iter().collect()))
                    .collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt dedup cache, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, seen }
    }

    /// Write the tracker back to its cache file.
    pub fn persist(&self) {
        let map: HashMap<&String, Vec<&String>> = self
            .seen
            .iter()
            .map(|(k, v)| (k, v.iter().collect()))
            .collect();
        match serde_json::to_string_pretty(&map) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "Failed to save dedup cache");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize dedup cache"),
        }
    }

    /// Stable fingerprint for a review: reviewer, publish time, and a hash
    /// of the leading text. Must not change between runs or the cache file
    /// is useless.
    pub fn fingerprint(review: &RawReview) -> String {
        let reviewer = review.reviewer_id.as_deref().unwrap_or("");
        let published = review
            .published_at_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();
        let head: String = review.body().chars().take(50).collect();
        format!("{}_{}_{}", reviewer, published, fnv1a(head.as_bytes()))
    }

    /// Keep only reviews not seen before for this place, recording the new
    /// ones as seen.
    pub fn filter_new(&mut self, place_id: &str, reviews: Vec<RawReview>) -> Vec<RawReview> {
        let existing = self.seen.entry(place_id.to_string()).or_default();
        let mut fresh = Vec::new();
        for review in reviews {
            let fp = Self::fingerprint(&review);
            if existing.insert(fp) {
                fresh.push(review);
            }
        }
        fresh
    }

    pub fn seen_count(&self, place_id: &str) -> usize {
        self.seen.get(place_id).map_or(0, |s| s.len())
    }

    pub fn reset_place(&mut self, place_id: &str) -> bool {
        let removed = self.seen.remove(place_id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    pub fn reset_all(&mut self) {
        self.seen.clear();
        self.persist();
    }
}

/// FNV-1a, 64-bit. Small and stable; speed is irrelevant at this volume.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(reviewer: &str, text: &str) -> RawReview {
        RawReview {
            review_id: None,
            reviewer_id: Some(reviewer.into()),
            name: None,
            text: Some(text.into()),
            text_translated: None,
            stars: Some(5),
            published_at_date: None,
            likes_count: None,
            review_image_urls: vec![],
        }
    }

    #[test]
    fn filters_repeat_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut tracker = DedupTracker::load(&path);

        let first = tracker.filter_new("place-1", vec![review("a", "bagus"), review("b", "ramah")]);
        assert_eq!(first.len(), 2);

        let second = tracker.filter_new("place-1", vec![review("a", "bagus"), review("c", "cepat")]);
        assert_eq!(second.len(), 1);
        assert_eq!(tracker.seen_count("place-1"), 3);
    }

    #[test]
    fn cache_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut tracker = DedupTracker::load(&path);
        tracker.filter_new("place-1", vec![review("a", "bagus")]);
        tracker.persist();

        let mut reloaded = DedupTracker::load(&path);
        let fresh = reloaded.filter_new("place-1", vec![review("a", "bagus")]);
        assert!(fresh.is_empty());
    }

    #[test]
    fn corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let tracker = DedupTracker::load(&path);
        assert_eq!(tracker.seen_count("place-1"), 0);
    }

    #[test]
    fn reset_clears_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut tracker = DedupTracker::load(&path);
        tracker.filter_new("place-1", vec![review("a", "bagus")]);

        assert!(tracker.reset_place("place-1"));
        assert!(!tracker.reset_place("place-1"));
        assert_eq!(tracker.seen_count("place-1"), 0);
    }

    #[test]
    fn fingerprints_differ_on_text() {
        let a = DedupTracker::fingerprint(&review("a", "bagus sekali"));
        let b = DedupTracker::fingerprint(&review("a", "buruk sekali"));
        assert_ne!(a, b);
    }
}

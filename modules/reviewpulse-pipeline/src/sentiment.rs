//! Sentiment classification: hosted model first, lexicon fallback second.
//!
//! The model is asked for strict JSON. Any failure along the way (client not
//! configured, HTTP error, malformed JSON) degrades to a rule-based keyword
//! analysis instead of failing the scrape, so a dead model endpoint never
//! blocks ingestion.

use std::time::Instant;

use ai_client::{ChatClient, ChatMessage};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::future::join_all;
use reviewpulse_common::{CleanedReview, SentimentAnalysis, SentimentLabel};
use serde::Deserialize;
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are an expert sentiment analyzer for Indonesian customer reviews. Always output valid JSON only.";

const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Cap on review text sent to the model. Google reviews rarely get near
/// this, but scrape output is untrusted input.
const MAX_PROMPT_REVIEW_BYTES: usize = 4000;

/// What the model is asked to return.
#[derive(Debug, Deserialize)]
struct ModelVerdict {
    sentiment: String,
    sentiment_score: f64,
    themes: Vec<String>,
    analysis_reasons: Vec<String>,
    ai_suggestions: Vec<String>,
}

#[derive(Clone)]
pub struct SentimentAnalyzer {
    client: Option<ChatClient>,
}

impl SentimentAnalyzer {
    /// `client` is None when no model token is configured; every analysis
    /// then uses the fallback path.
    pub fn new(client: Option<ChatClient>) -> Self {
        Self { client }
    }

    pub fn model_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Classify one review. Never fails: model errors fall back to the
    /// lexicon analysis with a note recording why.
    pub async fn analyze(&self, review: &CleanedReview) -> SentimentAnalysis {
        let Some(client) = &self.client else {
            return fallback_analysis(review, Some("model client not configured"));
        };

        match self.analyze_with_model(client, review).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(review_id = %review.id, error = %e, "Model analysis failed, using fallback");
                fallback_analysis(review, Some(&e.to_string()))
            }
        }
    }

    /// Classify a batch concurrently.
    pub async fn analyze_batch(&self, reviews: &[CleanedReview]) -> Vec<SentimentAnalysis> {
        join_all(reviews.iter().map(|r| self.analyze(r))).await
    }

    async fn analyze_with_model(
        &self,
        client: &ChatClient,
        review: &CleanedReview,
    ) -> Result<SentimentAnalysis> {
        let started = Instant::now();

        let content = client
            .chat(
                vec![
                    ChatMessage::system(SYSTEM_PROMPT),
                    ChatMessage::user(build_prompt(clip_for_prompt(&review.text), review.rating)),
                ],
                Some(1.0),
                Some(MAX_COMPLETION_TOKENS),
            )
            .await?;

        let verdict: ModelVerdict = serde_json::from_str(extract_verdict_json(&content))
            .context("Model returned non-JSON sentiment verdict")?;

        let sentiment = SentimentLabel::parse(&verdict.sentiment)
            .ok_or_else(|| anyhow!("Unknown sentiment label: {}", verdict.sentiment))?;

        Ok(SentimentAnalysis {
            id: review.id.clone(),
            review_text: review.text.clone(),
            rating: review.rating,
            reviewer_name: review.reviewer_name.clone(),
            review_at: review.published_at,
            sentiment,
            sentiment_score: verdict.sentiment_score.clamp(-1.0, 1.0),
            themes: verdict.themes,
            analysis_reasons: verdict.analysis_reasons,
            ai_suggestions: verdict.ai_suggestions,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            source: "hosted_model".to_string(),
            analyzed_at: Some(Utc::now()),
        })
    }
}

/// Cap the review text shipped to the model without splitting a multi-byte
/// character.
fn clip_for_prompt(text: &str) -> &str {
    if text.len() <= MAX_PROMPT_REVIEW_BYTES {
        return text;
    }
    let end = (0..=MAX_PROMPT_REVIEW_BYTES)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    &text[..end]
}

/// Models sometimes wrap the verdict in a markdown fence despite the prompt
/// forbidding it.
fn extract_verdict_json(content: &str) -> &str {
    let body = content.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn build_prompt(text: &str, rating: i32) -> String {
    format!(
        r#"Analisis review pelanggan berikut secara mendalam:

REVIEW: "{text}"
RATING: {rating}/5

Output JSON dengan format:
{{
"sentiment": "Positive" | "Neutral" | "Negative",
"sentiment_score": <-1.0 to 1.0>,
"themes": [<maksimal 5 tema spesifik>],
"analysis_reasons": [<minimal 3 alasan detail>],
"ai_suggestions": [<minimal 3 rekomendasi actionable>]
}}

ATURAN:
1. Sentiment dari tone review (rating hanya referensi)
2. Sentiment Score: Positive (0.3 to 1.0), Neutral (-0.3 to 0.3), Negative (-1.0 to -0.3)
3. Themes: Kualitas Produk, Pelayanan, Harga, Kecepatan, Kebersihan, dll
4. Analysis Reasons: Jelaskan detail kenapa sentiment tersebut
5. AI Suggestions: Konkret dan actionable untuk business

Output HANYA JSON valid, tanpa markdown atau teks tambahan."#
    )
}

// ---------------------------------------------------------------------------
// Rule-based fallback
// ---------------------------------------------------------------------------

const POSITIVE_STRONG: &[&str] = &[
    "luar biasa", "sangat bagus", "excellent", "perfect", "terbaik", "sempurna", "istimewa",
];
const POSITIVE_MEDIUM: &[&str] = &[
    "bagus", "baik", "enak", "puas", "senang", "recommended", "mantap", "ramah", "cepat",
    "bersih", "nyaman",
];
const POSITIVE_WEAK: &[&str] = &["lumayan", "cukup", "ok", "oke"];

const NEGATIVE_STRONG: &[&str] = &[
    "sangat buruk", "terrible", "parah banget", "mengecewakan sekali", "worst",
];
const NEGATIVE_MEDIUM: &[&str] = &[
    "buruk", "jelek", "kecewa", "lambat", "lama", "mahal", "kotor", "tidak enak", "kurang",
    "rusak",
];
const NEGATIVE_WEAK: &[&str] = &["tidak", "kurang", "biasa aja"];

const THEME_BUCKETS: &[(&str, &[&str])] = &[
    ("Kualitas Produk", &["makanan", "rasa", "enak", "menu", "produk", "lezat", "fresh"]),
    ("Kualitas Pelayanan", &["pelayanan", "service", "ramah", "staff", "karyawan", "sopan"]),
    ("Harga & Value", &["harga", "mahal", "murah", "value", "terjangkau"]),
    ("Kecepatan Layanan", &["cepat", "lama", "tunggu", "antri", "lambat"]),
    ("Kebersihan", &["bersih", "kotor", "higienis", "rapi"]),
    ("Suasana", &["suasana", "tempat", "nyaman", "lokasi", "atmosfer"]),
];

/// Positive/negative thresholds on the combined score.
const LABEL_THRESHOLD: f64 = 0.2;

fn lexicon_score(text: &str, strong: &[&str], medium: &[&str], weak: &[&str]) -> f64 {
    let score = strong.iter().filter(|w| text.contains(*w)).count() as f64 * 2.0
        + medium.iter().filter(|w| text.contains(*w)).count() as f64
        + weak.iter().filter(|w| text.contains(*w)).count() as f64 * 0.3;
    (score / 5.0).min(1.0)
}

/// Keyword-tier scoring used when the hosted model is unavailable. Text
/// weighs 70%, the star rating 30%.
pub fn fallback_analysis(review: &CleanedReview, note: Option<&str>) -> SentimentAnalysis {
    let started = Instant::now();
    let text = review.text.to_lowercase();

    let pos = lexicon_score(&text, POSITIVE_STRONG, POSITIVE_MEDIUM, POSITIVE_WEAK);
    let neg = lexicon_score(&text, NEGATIVE_STRONG, NEGATIVE_MEDIUM, NEGATIVE_WEAK);

    let text_score = (pos - neg) * 0.7;
    let rating_score = (review.rating - 3) as f64 / 2.0 * 0.3;
    let final_score = (text_score + rating_score).clamp(-1.0, 1.0);

    let sentiment = if final_score > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if final_score < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    let mut themes: Vec<String> = THEME_BUCKETS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(theme, _)| theme.to_string())
        .collect();
    if themes.is_empty() {
        themes.push("Pengalaman Umum".to_string());
    }
    themes.truncate(5);

    let reasons = match sentiment {
        SentimentLabel::Positive => vec![
            format!("Review menunjukkan apresiasi tinggi (positif: {pos:.2})"),
            format!("Rating {}/5 mengkonfirmasi kepuasan pelanggan", review.rating),
            "Tone keseluruhan positif dan merekomendasikan".to_string(),
        ],
        SentimentLabel::Negative => vec![
            format!("Review mengandung keluhan signifikan (negatif: {neg:.2})"),
            format!("Rating {}/5 menunjukkan ketidakpuasan", review.rating),
            "Customer mengekspresikan kekecewaan yang perlu ditindaklanjuti".to_string(),
        ],
        SentimentLabel::Neutral => vec![
            "Review menunjukkan pengalaman standar".to_string(),
            format!("Rating {}/5 berada di level netral", review.rating),
            format!("Balance antara positif ({pos:.2}) dan negatif ({neg:.2})"),
        ],
    };

    let suggestions = match sentiment {
        SentimentLabel::Negative => vec![
            "Follow-up customer untuk resolve issue".to_string(),
            "Evaluasi ulang proses layanan yang dikeluhkan".to_string(),
            "Tawarkan kompensasi untuk restore trust".to_string(),
        ],
        SentimentLabel::Positive => vec![
            "Kirim thank you message untuk strengthen relationship".to_string(),
            "Jadikan testimoni untuk marketing".to_string(),
            "Maintain kualitas layanan yang sudah diberikan".to_string(),
        ],
        SentimentLabel::Neutral => vec![
            "Monitor trend untuk identify improvement".to_string(),
            "Proactive engagement untuk understand expectations".to_string(),
            "Follow-up survey untuk detailed feedback".to_string(),
        ],
    };

    let mut analysis_reasons = reasons;
    if let Some(note) = note {
        analysis_reasons.push(format!("Fallback used: {note}"));
    }

    SentimentAnalysis {
        id: review.id.clone(),
        review_text: review.text.clone(),
        rating: review.rating,
        reviewer_name: review.reviewer_name.clone(),
        review_at: review.published_at,
        sentiment,
        sentiment_score: (final_score * 100.0).round() / 100.0,
        themes,
        analysis_reasons,
        ai_suggestions: suggestions,
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        source: "rule_based_fallback".to_string(),
        analyzed_at: Some(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(text: &str, rating: i32) -> CleanedReview {
        CleanedReview {
            id: "r1".into(),
            text: text.into(),
            rating,
            reviewer_name: None,
            published_at: None,
            likes_count: 0,
        }
    }

    #[test]
    fn fallback_labels_positive_review() {
        let analysis = fallback_analysis(&review("Pelayanan sangat bagus, staff ramah", 5), None);
        assert_eq!(analysis.sentiment, SentimentLabel::Positive);
        assert!(analysis.sentiment_score > 0.2);
        assert!(analysis.themes.contains(&"Kualitas Pelayanan".to_string()));
        assert_eq!(analysis.source, "rule_based_fallback");
    }

    #[test]
    fn fallback_labels_negative_review() {
        let analysis = fallback_analysis(&review("Sangat buruk, pelayanan lambat dan kotor", 1), None);
        assert_eq!(analysis.sentiment, SentimentLabel::Negative);
        assert!(analysis.sentiment_score < -0.2);
    }

    #[test]
    fn fallback_labels_neutral_review() {
        let analysis = fallback_analysis(&review("Datang servis rutin seperti biasa", 3), None);
        assert_eq!(analysis.sentiment, SentimentLabel::Neutral);
    }

    #[test]
    fn fallback_defaults_theme_when_nothing_matches() {
        let analysis = fallback_analysis(&review("Datang pagi pulang siang", 3), None);
        assert_eq!(analysis.themes, vec!["Pengalaman Umum".to_string()]);
    }

    #[test]
    fn fallback_records_failure_note() {
        let analysis = fallback_analysis(&review("Bagus", 4), Some("timeout"));
        assert!(analysis
            .analysis_reasons
            .iter()
            .any(|r| r.contains("timeout")));
    }

    #[test]
    fn score_stays_in_range() {
        let analysis = fallback_analysis(
            &review(
                "luar biasa sangat bagus excellent perfect terbaik sempurna istimewa mantap",
                5,
            ),
            None,
        );
        assert!(analysis.sentiment_score <= 1.0);
    }

    #[tokio::test]
    async fn analyzer_without_client_uses_fallback() {
        let analyzer = SentimentAnalyzer::new(None);
        let analysis = analyzer.analyze(&review("Bengkel bersih dan nyaman", 5)).await;
        assert_eq!(analysis.source, "rule_based_fallback");
        assert!(!analyzer.model_configured());
    }

    #[test]
    fn verdict_parses_fenced_json() {
        let content = "```json\n{\"sentiment\":\"Positive\",\"sentiment_score\":0.8,\"themes\":[\"Pelayanan\"],\"analysis_reasons\":[\"a\",\"b\",\"c\"],\"ai_suggestions\":[\"x\",\"y\",\"z\"]}\n```";
        let verdict: ModelVerdict =
            serde_json::from_str(extract_verdict_json(content)).unwrap();
        assert_eq!(verdict.sentiment, "Positive");
        assert_eq!(verdict.themes.len(), 1);
    }

    #[test]
    fn verdict_extraction_handles_plain_and_fenced_output() {
        assert_eq!(extract_verdict_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_verdict_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_verdict_json("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn prompt_clip_respects_char_boundaries() {
        // 3-byte characters, so the byte cap lands mid-character.
        let long = "世".repeat(MAX_PROMPT_REVIEW_BYTES);
        let clipped = clip_for_prompt(&long);
        assert!(clipped.len() <= MAX_PROMPT_REVIEW_BYTES);
        assert!(long.starts_with(clipped));
        assert_eq!(clipped.chars().last(), Some('世'));

        let short = "Pelayanan bagus";
        assert_eq!(clip_for_prompt(short), short);
    }
}

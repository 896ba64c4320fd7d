//! Postgres persistence for classified reviews.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reviewpulse_common::{SentimentAnalysis, SentimentLabel};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sentiment_analysis (
    id                  TEXT PRIMARY KEY,
    review_text         TEXT NOT NULL,
    rating              INTEGER NOT NULL,
    reviewer_name       TEXT,
    review_at           TIMESTAMPTZ,
    sentiment           TEXT NOT NULL,
    sentiment_score     DOUBLE PRECISION NOT NULL,
    themes              JSONB NOT NULL DEFAULT '[]'::jsonb,
    analysis_reasons    JSONB NOT NULL DEFAULT '[]'::jsonb,
    ai_suggestions      JSONB NOT NULL DEFAULT '[]'::jsonb,
    processing_time_ms  DOUBLE PRECISION,
    source              TEXT,
    analyzed_at         TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_sentiment_analysis_sentiment ON sentiment_analysis (sentiment);
CREATE INDEX IF NOT EXISTS idx_sentiment_analysis_rating ON sentiment_analysis (rating);
CREATE INDEX IF NOT EXISTS idx_sentiment_analysis_analyzed_at ON sentiment_analysis (analyzed_at);
"#;

const SELECT_COLUMNS: &str = "id, review_text, rating, reviewer_name, review_at, sentiment, \
     sentiment_score, themes, analysis_reasons, ai_suggestions, processing_time_ms, source, \
     analyzed_at";

/// Filters for listing persisted analyses. Dates apply to `analyzed_at`.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFilter {
    pub limit: i64,
    pub offset: i64,
    pub sentiment: Option<SentimentLabel>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Aggregates over the same filter as a listing.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_reviews: i64,
    pub positive_count: i64,
    pub neutral_count: i64,
    pub negative_count: i64,
    pub average_sentiment_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPage {
    pub results: Vec<SentimentAnalysis>,
    pub summary: AnalysisSummary,
}

/// Store-wide aggregates for the statistics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentStatistics {
    pub total_reviews: i64,
    pub average_rating: f64,
    pub average_sentiment_score: f64,
    pub positive_count: i64,
    pub neutral_count: i64,
    pub negative_count: i64,
    pub sentiment_distribution: SentimentDistribution,
}

/// Percentage share per label, one decimal place.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentDistribution {
    #[serde(rename = "Positive")]
    pub positive: f64,
    #[serde(rename = "Neutral")]
    pub neutral: f64,
    #[serde(rename = "Negative")]
    pub negative: f64,
}

#[derive(Clone)]
pub struct SentimentStore {
    pool: PgPool,
}

impl SentimentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create the table and indexes if absent. Safe to run on every startup.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert or replace an analysis by review id.
    pub async fn upsert(&self, analysis: &SentimentAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sentiment_analysis
                (id, review_text, rating, reviewer_name, review_at, sentiment, sentiment_score,
                 themes, analysis_reasons, ai_suggestions, processing_time_ms, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                review_text = EXCLUDED.review_text,
                rating = EXCLUDED.rating,
                reviewer_name = EXCLUDED.reviewer_name,
                review_at = EXCLUDED.review_at,
                sentiment = EXCLUDED.sentiment,
                sentiment_score = EXCLUDED.sentiment_score,
                themes = EXCLUDED.themes,
                analysis_reasons = EXCLUDED.analysis_reasons,
                ai_suggestions = EXCLUDED.ai_suggestions,
                processing_time_ms = EXCLUDED.processing_time_ms,
                source = EXCLUDED.source,
                updated_at = now()
            "#,
        )
        .bind(&analysis.id)
        .bind(&analysis.review_text)
        .bind(analysis.rating)
        .bind(&analysis.reviewer_name)
        .bind(analysis.review_at)
        .bind(analysis.sentiment.as_str())
        .bind(analysis.sentiment_score)
        .bind(serde_json::to_value(&analysis.themes)?)
        .bind(serde_json::to_value(&analysis.analysis_reasons)?)
        .bind(serde_json::to_value(&analysis.ai_suggestions)?)
        .bind(analysis.processing_time_ms)
        .bind(&analysis.source)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<SentimentAnalysis>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sentiment_analysis WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_analysis(&r)).transpose()
    }

    /// A review is considered analyzed only when the stored text matches,
    /// so edited reviews get re-classified.
    pub async fn is_analyzed(&self, id: &str, text: &str) -> Result<bool> {
        let row = sqlx::query("SELECT review_text FROM sentiment_analysis WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|r| r.get::<String, _>("review_text") == text)
            .unwrap_or(false))
    }

    pub async fn list(&self, filter: &AnalysisFilter) -> Result<AnalysisPage> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS} FROM sentiment_analysis WHERE 1=1"
        ));
        push_filters(&mut query, filter);
        query.push(" ORDER BY analyzed_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.offset);

        let rows = query.build().fetch_all(&self.pool).await?;
        let results = rows
            .iter()
            .map(row_to_analysis)
            .collect::<Result<Vec<_>>>()?;

        // Summary runs over the same filter, without pagination.
        let mut summary_query = QueryBuilder::new(
            "SELECT COUNT(*) AS total_reviews, \
             COUNT(*) FILTER (WHERE sentiment = 'Positive') AS positive_count, \
             COUNT(*) FILTER (WHERE sentiment = 'Neutral') AS neutral_count, \
             COUNT(*) FILTER (WHERE sentiment = 'Negative') AS negative_count, \
             AVG(sentiment_score) AS average_sentiment_score \
             FROM sentiment_analysis WHERE 1=1",
        );
        push_filters(&mut summary_query, filter);

        let row = summary_query.build().fetch_one(&self.pool).await?;
        let summary = AnalysisSummary {
            total_reviews: row.get("total_reviews"),
            positive_count: row.get("positive_count"),
            neutral_count: row.get("neutral_count"),
            negative_count: row.get("negative_count"),
            average_sentiment_score: row.get("average_sentiment_score"),
        };

        Ok(AnalysisPage { results, summary })
    }

    pub async fn statistics(&self) -> Result<SentimentStatistics> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
             AVG(rating::double precision) AS avg_rating, \
             AVG(sentiment_score) AS avg_score, \
             COUNT(*) FILTER (WHERE sentiment = 'Positive') AS positive_count, \
             COUNT(*) FILTER (WHERE sentiment = 'Neutral') AS neutral_count, \
             COUNT(*) FILTER (WHERE sentiment = 'Negative') AS negative_count \
             FROM sentiment_analysis",
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        let positive: i64 = row.get("positive_count");
        let neutral: i64 = row.get("neutral_count");
        let negative: i64 = row.get("negative_count");
        let denom = total.max(1) as f64;

        let pct = |count: i64| ((count as f64 / denom) * 1000.0).round() / 10.0;
        let round2 = |v: f64| (v * 100.0).round() / 100.0;

        Ok(SentimentStatistics {
            total_reviews: total,
            average_rating: round2(row.get::<Option<f64>, _>("avg_rating").unwrap_or(0.0)),
            average_sentiment_score: round2(row.get::<Option<f64>, _>("avg_score").unwrap_or(0.0)),
            positive_count: positive,
            neutral_count: neutral,
            negative_count: negative,
            sentiment_distribution: SentimentDistribution {
                positive: pct(positive),
                neutral: pct(neutral),
                negative: pct(negative),
            },
        })
    }
}

fn push_filters(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &AnalysisFilter) {
    if let Some(sentiment) = filter.sentiment {
        query.push(" AND sentiment = ");
        query.push_bind(sentiment.as_str());
    }
    if let Some(start) = filter.start_date {
        query.push(" AND analyzed_at >= ");
        query.push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND analyzed_at <= ");
        query.push_bind(end);
    }
}

fn row_to_analysis(row: &PgRow) -> Result<SentimentAnalysis> {
    let sentiment_text: String = row.get("sentiment");
    let sentiment = SentimentLabel::parse(&sentiment_text)
        .ok_or_else(|| anyhow::anyhow!("Unknown sentiment in database: {sentiment_text}"))?;

    Ok(SentimentAnalysis {
        id: row.get("id"),
        review_text: row.get("review_text"),
        rating: row.get("rating"),
        reviewer_name: row.get("reviewer_name"),
        review_at: row.get("review_at"),
        sentiment,
        sentiment_score: row.get("sentiment_score"),
        themes: serde_json::from_value(row.get("themes"))?,
        analysis_reasons: serde_json::from_value(row.get("analysis_reasons"))?,
        ai_suggestions: serde_json::from_value(row.get("ai_suggestions"))?,
        processing_time_ms: row.get::<Option<f64>, _>("processing_time_ms").unwrap_or(0.0),
        source: row.get::<Option<String>, _>("source").unwrap_or_default(),
        analyzed_at: row.get("analyzed_at"),
    })
}

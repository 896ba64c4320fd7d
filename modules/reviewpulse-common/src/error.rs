use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewPulseError {
    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Sentiment analysis error: {0}")]
    Analysis(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<apify_client::ApifyError> for ReviewPulseError {
    fn from(err: apify_client::ApifyError) -> Self {
        ReviewPulseError::Scraping(err.to_string())
    }
}

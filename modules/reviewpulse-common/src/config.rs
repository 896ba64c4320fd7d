use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Apify scraping
    pub apify_token: String,

    // Hosted model (OpenAI-compatible, defaults target GitHub Models)
    pub github_token: Option<String>,
    pub github_endpoint: String,
    pub github_model: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Dedup cache
    pub review_cache_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            apify_token: required_env("APIFY_API_TOKEN"),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            github_endpoint: env::var("GITHUB_ENDPOINT")
                .unwrap_or_else(|_| "https://models.github.ai/inference".to_string()),
            github_model: env::var("GITHUB_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            review_cache_path: env::var("REVIEW_CACHE_PATH")
                .unwrap_or_else(|_| "scraped_reviews.json".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

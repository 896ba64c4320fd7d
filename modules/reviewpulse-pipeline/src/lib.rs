pub mod cleaner;
pub mod dedup;
pub mod pipeline;
pub mod sentiment;
pub mod store;

pub use dedup::DedupTracker;
pub use pipeline::{
    BatchOutcome, ClassifiedReview, LocationOutcome, LocationReport, ReviewPipeline, ScrapeOptions,
    SkippedReview,
};
pub use sentiment::SentimentAnalyzer;
pub use store::{AnalysisFilter, AnalysisPage, AnalysisSummary, SentimentStatistics, SentimentStore};

//! Cascade stages, in the order the pipeline tries them.

pub mod website;
pub mod directory;
pub mod scrape;
pub mod ai_extractor;
pub mod prioritizer;

pub use ai_extractor::{AiExtraction, ContentExtractor};
pub use directory::{DirectoryLookup, DirectoryOutcome};
pub use prioritizer::EmailPrioritizer;
pub use scrape::{CrawlReport, ScrapeFallback, ScrapeOutcome};
pub use website::WebsiteResolver;

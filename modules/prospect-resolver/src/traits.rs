// Trait abstractions for every external collaborator of the resolution pipeline.
//
// WebSearch, EmailDirectory and LanguageModel wrap the paid third-party APIs.
// PageFetcher hides HTTP. CompanyStore and RateLimitLog hide Postgres.
//
// Each has an in-memory double in `testing`, so the whole cascade runs under
// `cargo test` without network or database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prospect_common::{CompanyIdentity, ResolutionResult, WebsiteCandidate};

// ---------------------------------------------------------------------------
// WebSearch: search engine (Serper)
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Organic results for `query`, at most `max_results`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebsiteCandidate>>;
}

#[async_trait]
impl WebSearch for serper_client::SerperClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebsiteCandidate>> {
        let results = serper_client::SerperClient::search(self, query, max_results).await?;
        Ok(results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .map(|r| WebsiteCandidate {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// EmailDirectory: domain -> organizational mailboxes (Hunter)
// ---------------------------------------------------------------------------

/// A mailbox reported by the directory for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEmail {
    pub address: String,
    /// Provider score, 0-100.
    pub confidence: u8,
    pub department: Option<String>,
}

impl DirectoryEmail {
    pub fn new(address: impl Into<String>, confidence: u8, department: Option<&str>) -> Self {
        Self {
            address: address.into(),
            confidence,
            department: department.map(str::to_string),
        }
    }
}

#[async_trait]
pub trait EmailDirectory: Send + Sync {
    /// Generic (non-personal) mailboxes known for `domain`.
    async fn domain_emails(&self, domain: &str) -> Result<Vec<DirectoryEmail>>;
}

/// Mailboxes requested per domain search.
const DIRECTORY_LIMIT: u32 = 10;

#[async_trait]
impl EmailDirectory for hunter_client::HunterClient {
    async fn domain_emails(&self, domain: &str) -> Result<Vec<DirectoryEmail>> {
        let search = self
            .domain_search(domain, hunter_client::EmailTypeFilter::Generic, DIRECTORY_LIMIT)
            .await?;
        Ok(search
            .emails
            .into_iter()
            // The type filter is advisory on Hunter's side; personal names are never cold-mailed.
            .filter(|e| e.email_type != Some(hunter_client::EmailType::Personal))
            .map(|e| DirectoryEmail {
                address: e.value,
                confidence: e.confidence.unwrap_or(0),
                department: e.department,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// LanguageModel: chat completion
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One system + user turn; returns the raw assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl LanguageModel for ai_client::OpenAi {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.chat_completion(system, user).await
    }
}

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// What one fetched page contributes to the cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    /// Lowercased, deduplicated, filtered addresses (visible + `mailto:`).
    pub emails: Vec<String>,
    /// Cleaned, whitespace-collapsed, length-capped page text.
    pub text: String,
    pub has_contact_form: bool,
}

impl FetchedPage {
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Never fails: transport errors, timeouts and non-2xx statuses yield an empty page.
    async fn fetch(&self, url: &str) -> FetchedPage;
}

// ---------------------------------------------------------------------------
// CompanyStore: external company records
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Companies owned by `caller` with no selected email that were never searched.
    async fn pending_companies(&self, caller: &str, limit: usize) -> Result<Vec<CompanyIdentity>>;

    /// How many of `caller`'s companies `pending_companies` would still return.
    async fn count_unresolved(&self, caller: &str) -> Result<u64>;

    /// Write website, emails, selected email and careers-page note back to the record.
    async fn save_resolution(
        &self,
        company: &CompanyIdentity,
        result: &ResolutionResult,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// RateLimitLog: append-only per-caller action log
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RateLimitLog: Send + Sync {
    /// Rows for (`caller`, `action`) created after `since`.
    async fn count_since(&self, caller: &str, action: &str, since: DateTime<Utc>) -> Result<u64>;

    /// Append one row for (`caller`, `action`).
    async fn record(&self, caller: &str, action: &str) -> Result<()>;
}

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Input ---

/// A company as read from the external company store. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyIdentity {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    /// National registry number (SIREN).
    pub registry_id: String,
    pub activity_code: Option<String>,
    pub activity_label: Option<String>,
    pub notes: Option<String>,
}

/// One organic search hit considered as the company's website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

// --- Emails ---

/// Which cascade stage produced an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailSource {
    Directory,
    Scrape,
    AiFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCandidate {
    pub address: String,
    pub source: EmailSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_role: Option<String>,
}

impl EmailCandidate {
    pub fn new(address: impl Into<String>, source: EmailSource) -> Self {
        Self {
            address: address.into(),
            source,
            organizational_role: None,
        }
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.organizational_role = role;
        self
    }
}

/// Ordered set of candidates, unique by case-insensitive address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSet {
    items: Vec<EmailCandidate>,
    seen: HashSet<String>,
}

impl EmailSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_addresses<I, S>(addresses: I, source: EmailSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for address in addresses {
            set.insert(EmailCandidate::new(address, source));
        }
        set
    }

    /// Insert unless an address differing only by case is already present.
    pub fn insert(&mut self, candidate: EmailCandidate) -> bool {
        let key = candidate.address.trim().to_lowercase();
        if key.is_empty() || !self.seen.insert(key) {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.seen.contains(&address.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.items.iter().map(|c| c.address.clone()).collect()
    }

    pub fn into_vec(self) -> Vec<EmailCandidate> {
        self.items
    }
}

// --- Outcome ---

/// Coarse trust tag, ordered `None < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::None => "none",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(s)
    }
}

/// The stage a resolution outcome is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    Directory,
    Scrape,
    AiFallback,
    None,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionSource::Directory => "directory",
            ResolutionSource::Scrape => "scrape",
            ResolutionSource::AiFallback => "ai-fallback",
            ResolutionSource::None => "none",
        }
    }

    /// Confidence a hit from this stage carries.
    pub fn confidence(self) -> Confidence {
        match self {
            ResolutionSource::Directory => Confidence::High,
            ResolutionSource::Scrape => Confidence::Medium,
            ResolutionSource::AiFallback => Confidence::Low,
            ResolutionSource::None => Confidence::None,
        }
    }
}

impl From<EmailSource> for ResolutionSource {
    fn from(source: EmailSource) -> Self {
        match source {
            EmailSource::Directory => ResolutionSource::Directory,
            EmailSource::Scrape => ResolutionSource::Scrape,
            EmailSource::AiFallback => ResolutionSource::AiFallback,
        }
    }
}

pub const NO_WEBSITE_ERROR: &str = "no official website found";
pub const NO_EMAIL_ERROR: &str = "no email found";
pub const FORM_AVAILABLE: &str = "form available";

/// One company's outcome for one pipeline run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub company_id: Uuid,
    pub website: Option<String>,
    pub emails: Vec<EmailCandidate>,
    pub selected_email: Option<String>,
    pub confidence: Confidence,
    pub source: ResolutionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolutionResult {
    /// No website could be found; the cascade never started.
    pub fn website_unresolved(company_id: Uuid) -> Self {
        Self {
            company_id,
            website: None,
            emails: Vec::new(),
            selected_email: None,
            confidence: Confidence::None,
            source: ResolutionSource::None,
            career_page_url: None,
            alternative_contact: None,
            error: Some(NO_WEBSITE_ERROR.to_string()),
        }
    }

    /// Emails were found by `source`. `selected` is dropped unless it belongs to `emails`.
    pub fn found(
        company_id: Uuid,
        website: String,
        source: ResolutionSource,
        emails: EmailSet,
        selected: Option<String>,
        career_page_url: Option<String>,
    ) -> Self {
        let selected = selected.filter(|s| emails.contains(s));
        let emails = emails.into_vec();
        let confidence = if emails.is_empty() {
            Confidence::None
        } else {
            source.confidence()
        };
        Self {
            company_id,
            website: Some(website),
            error: emails.is_empty().then(|| NO_EMAIL_ERROR.to_string()),
            emails,
            selected_email: selected,
            confidence,
            source,
            career_page_url,
            alternative_contact: None,
        }
    }

    /// Website known but every stage came back empty.
    pub fn not_found(
        company_id: Uuid,
        website: String,
        source: ResolutionSource,
        career_page_url: Option<String>,
        alternative_contact: Option<String>,
    ) -> Self {
        Self {
            company_id,
            website: Some(website),
            emails: Vec::new(),
            selected_email: None,
            confidence: Confidence::None,
            source,
            career_page_url,
            error: alternative_contact.is_none().then(|| NO_EMAIL_ERROR.to_string()),
            alternative_contact,
        }
    }

    pub fn email_addresses(&self) -> Vec<String> {
        self.emails.iter().map(|c| c.address.clone()).collect()
    }

    pub fn is_found(&self) -> bool {
        self.selected_email.is_some()
    }
}

/// Per-batch tally returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub processed: usize,
    pub found: usize,
    pub not_found: usize,
    pub has_more: bool,
}

impl BatchSummary {
    pub fn tally(results: &[ResolutionResult], has_more: bool) -> Self {
        let found = results.iter().filter(|r| r.is_found()).count();
        Self {
            processed: results.len(),
            found,
            not_found: results.len() - found,
            has_more,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} found={} not_found={} has_more={}",
            self.processed, self.found, self.not_found, self.has_more
        )
    }
}

/// Response of one batch invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<ResolutionResult>,
    pub summary: BatchSummary,
    pub has_more: bool,
    pub message: String,
}

impl BatchReport {
    pub fn new(results: Vec<ResolutionResult>, has_more: bool) -> Self {
        let summary = BatchSummary::tally(&results, has_more);
        let message = if summary.processed == 0 {
            "No companies left to resolve".to_string()
        } else if has_more {
            format!(
                "Processed {} companies ({} with email, {} without); more remain",
                summary.processed, summary.found, summary.not_found
            )
        } else {
            format!(
                "Processed {} companies ({} with email, {} without); all done",
                summary.processed, summary.found, summary.not_found
            )
        };
        Self {
            success: true,
            processed: summary.processed,
            results,
            summary,
            has_more,
            message,
        }
    }
}

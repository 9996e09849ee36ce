// Test doubles for the resolution pipeline.
//
// One per trait seam:
// - MockSearch (WebSearch): query -> results, `Err` for unregistered queries
// - MockDirectory (EmailDirectory): domain -> mailboxes, empty when unregistered
// - MockLanguageModel (LanguageModel): queue of canned answers, records prompts
// - MockPageFetcher (PageFetcher): URL -> page, empty page when unregistered
// - InMemoryCompanyStore (CompanyStore): per-caller records with resolution state
// - InMemoryRateLog (RateLimitLog): timestamped rows
//
// Plus helpers for building companies and search candidates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use prospect_common::{CompanyIdentity, ResolutionResult, WebsiteCandidate};

use crate::infra::parse_page;
use crate::traits::{
    CompanyStore, DirectoryEmail, EmailDirectory, FetchedPage, LanguageModel, PageFetcher,
    RateLimitLog, WebSearch,
};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn company(name: &str, city: Option<&str>) -> CompanyIdentity {
    CompanyIdentity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        city: city.map(str::to_string),
        registry_id: "552100554".to_string(),
        activity_code: Some("62.01Z".to_string()),
        activity_label: Some("Programmation informatique".to_string()),
        notes: None,
    }
}

pub fn candidate(url: &str, title: &str) -> WebsiteCandidate {
    WebsiteCandidate {
        url: url.to_string(),
        title: title.to_string(),
        snippet: format!("{title} - site officiel"),
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

pub struct MockSearch {
    results: HashMap<String, Vec<WebsiteCandidate>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_search(mut self, query: &str, results: Vec<WebsiteCandidate>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebsiteCandidate>> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results
            .get(query)
            .map(|r| r.iter().take(max_results).cloned().collect())
            .ok_or_else(|| anyhow!("MockSearch: no results registered for {query}"))
    }
}

// ---------------------------------------------------------------------------
// MockDirectory
// ---------------------------------------------------------------------------

pub struct MockDirectory {
    domains: HashMap<String, Vec<DirectoryEmail>>,
    failing: HashSet<String>,
    queried: Mutex<Vec<String>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            domains: HashMap::new(),
            failing: HashSet::new(),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn on_domain(mut self, domain: &str, emails: Vec<DirectoryEmail>) -> Self {
        self.domains.insert(domain.to_string(), emails);
        self
    }

    pub fn fail_on(mut self, domain: &str) -> Self {
        self.failing.insert(domain.to_string());
        self
    }

    pub fn queried_domains(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailDirectory for MockDirectory {
    async fn domain_emails(&self, domain: &str) -> Result<Vec<DirectoryEmail>> {
        self.queried.lock().unwrap().push(domain.to_string());
        if self.failing.contains(domain) {
            bail!("MockDirectory: simulated failure for {domain}");
        }
        Ok(self.domains.get(domain).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockLanguageModel
// ---------------------------------------------------------------------------

/// Answers are consumed in order; an exhausted queue is an error.
pub struct MockLanguageModel {
    answers: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, answer: &str) -> Self {
        self.answers.lock().unwrap().push_back(Ok(answer.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.answers.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    /// `(system, user)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(anyhow!(message)),
            None => bail!("MockLanguageModel: no answer queued"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

pub struct MockPageFetcher {
    pages: HashMap<String, FetchedPage>,
    visited: Mutex<Vec<String>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn on_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Register raw HTML, run through the real page parser.
    pub fn on_html(self, url: &str, html: &str) -> Self {
        let page = parse_page(url, html);
        self.on_page(url, page)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> FetchedPage {
        self.visited.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchedPage::empty(url))
    }
}

// ---------------------------------------------------------------------------
// InMemoryCompanyStore
// ---------------------------------------------------------------------------

struct StoredCompany {
    owner: String,
    company: CompanyIdentity,
    selected_email: Option<String>,
    searched: bool,
}

/// Mirrors the Postgres selection rule: pending = no selected email and never searched.
pub struct InMemoryCompanyStore {
    companies: Mutex<Vec<StoredCompany>>,
    saved: Mutex<Vec<ResolutionResult>>,
    fail_saves: bool,
    fail_counts: bool,
}

impl InMemoryCompanyStore {
    pub fn new() -> Self {
        Self {
            companies: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            fail_saves: false,
            fail_counts: false,
        }
    }

    pub fn with_company(self, owner: &str, company: CompanyIdentity) -> Self {
        self.companies.lock().unwrap().push(StoredCompany {
            owner: owner.to_string(),
            company,
            selected_email: None,
            searched: false,
        });
        self
    }

    /// A company that already carries a selected email.
    pub fn with_resolved(self, owner: &str, company: CompanyIdentity, email: &str) -> Self {
        self.companies.lock().unwrap().push(StoredCompany {
            owner: owner.to_string(),
            company,
            selected_email: Some(email.to_string()),
            searched: true,
        });
        self
    }

    /// Every `save_resolution` call fails.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn failing_counts(mut self) -> Self {
        self.fail_counts = true;
        self
    }

    pub fn saved(&self) -> Vec<ResolutionResult> {
        self.saved.lock().unwrap().clone()
    }

    pub fn notes(&self, company_id: Uuid) -> Option<String> {
        self.companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.company.id == company_id)
            .and_then(|c| c.company.notes.clone())
    }

    fn is_pending(c: &StoredCompany, caller: &str) -> bool {
        c.owner == caller && c.selected_email.is_none() && !c.searched
    }
}

impl Default for InMemoryCompanyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn pending_companies(&self, caller: &str, limit: usize) -> Result<Vec<CompanyIdentity>> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .filter(|c| Self::is_pending(c, caller))
            .take(limit)
            .map(|c| c.company.clone())
            .collect())
    }

    async fn count_unresolved(&self, caller: &str) -> Result<u64> {
        if self.fail_counts {
            bail!("InMemoryCompanyStore: simulated count failure");
        }
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .filter(|c| Self::is_pending(c, caller))
            .count() as u64)
    }

    async fn save_resolution(
        &self,
        company: &CompanyIdentity,
        result: &ResolutionResult,
    ) -> Result<()> {
        if self.fail_saves {
            bail!("InMemoryCompanyStore: simulated write failure");
        }
        let mut companies = self.companies.lock().unwrap();
        let stored = companies
            .iter_mut()
            .find(|c| c.company.id == company.id)
            .ok_or_else(|| anyhow!("InMemoryCompanyStore: unknown company {}", company.id))?;
        stored.selected_email = result.selected_email.clone();
        stored.searched = true;
        if let Some(url) = &result.career_page_url {
            stored.company.notes = Some(crate::store::notes_with_career_page(
                stored.company.notes.as_deref(),
                url,
            ));
        }
        self.saved.lock().unwrap().push(result.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryRateLog
// ---------------------------------------------------------------------------

pub struct InMemoryRateLog {
    rows: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

impl InMemoryRateLog {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn with_entry(self, caller: &str, action: &str, at: DateTime<Utc>) -> Self {
        self.rows
            .lock()
            .unwrap()
            .push((caller.to_string(), action.to_string(), at));
        self
    }

    /// All rows for (`caller`, `action`), expired or not.
    pub fn rows(&self, caller: &str, action: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, a, _)| c == caller && a == action)
            .count()
    }
}

impl Default for InMemoryRateLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitLog for InMemoryRateLog {
    async fn count_since(&self, caller: &str, action: &str, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, a, at)| c == caller && a == action && *at > since)
            .count() as u64)
    }

    async fn record(&self, caller: &str, action: &str) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .push((caller.to_string(), action.to_string(), Utc::now()));
        Ok(())
    }
}

//! Per-company finite-state machine over the cascade, and the batch loop around it.

pub mod state;

use std::sync::Arc;

use tracing::{info, warn};

use prospect_common::{
    extract_domain, BatchReport, CompanyIdentity, EmailSet, EmailSource, PipelineSettings,
    ProspectError, ResolutionResult, ResolutionSource, FORM_AVAILABLE,
};

use crate::deps::PipelineDeps;
use crate::rate_limit::RateLimiter;
use crate::stages::{
    ContentExtractor, DirectoryLookup, EmailPrioritizer, ScrapeFallback, ScrapeOutcome,
    WebsiteResolver,
};
use crate::traits::CompanyStore;

pub use state::{ResolutionState, StateKind};

/// Largest batch a single invocation accepts.
pub const MAX_BATCH: usize = 150;

/// Batch size used when the caller does not ask for one.
pub const DEFAULT_BATCH: usize = 10;

/// Rate-limit log action for batch invocations.
pub const RESOLVE_ACTION: &str = "resolve_contacts";

/// Check a caller-supplied batch size against `1..=MAX_BATCH`.
pub fn validate_batch_size(requested: i64) -> Result<usize, ProspectError> {
    usize::try_from(requested)
        .ok()
        .filter(|n| (1..=MAX_BATCH).contains(n))
        .ok_or_else(|| {
            ProspectError::InvalidRequest(format!(
                "maxCompanies must be between 1 and {MAX_BATCH}, got {requested}"
            ))
        })
}

/// One company's terminal result plus the states it went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: ResolutionResult,
    pub path: Vec<StateKind>,
}

pub struct Pipeline {
    resolver: WebsiteResolver,
    directory: DirectoryLookup,
    scraper: ScrapeFallback,
    extractor: ContentExtractor,
    prioritizer: EmailPrioritizer,
    store: Arc<dyn CompanyStore>,
    rate_limiter: RateLimiter,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let keywords = deps.settings.priority_keywords.clone();
        Self {
            resolver: WebsiteResolver::new(deps.search, deps.llm.clone()),
            directory: DirectoryLookup::new(deps.directory, keywords.clone()),
            scraper: ScrapeFallback::new(deps.fetcher, deps.settings.page_delay),
            extractor: ContentExtractor::new(deps.llm),
            prioritizer: EmailPrioritizer::new(keywords),
            store: deps.store,
            rate_limiter: RateLimiter::new(deps.rate_log),
            settings: deps.settings,
        }
    }

    /// Run the state machine for one company until it reaches `Done`.
    pub async fn resolve_company(&self, company: &CompanyIdentity) -> Resolution {
        let mut state = ResolutionState::Pending;
        let mut path = vec![state.kind()];

        loop {
            state = self.step(company, state).await;
            path.push(state.kind());
            if let ResolutionState::Done(result) = state {
                return Resolution { result, path };
            }
        }
    }

    /// One transition. Every stage swallows its own failures, so this never errors.
    async fn step(&self, company: &CompanyIdentity, state: ResolutionState) -> ResolutionState {
        match state {
            ResolutionState::Pending => match self.resolver.resolve(company).await {
                Some(website) => ResolutionState::WebsiteResolved { website },
                None => ResolutionState::WebsiteUnresolved,
            },

            ResolutionState::WebsiteUnresolved => {
                ResolutionState::Done(ResolutionResult::website_unresolved(company.id))
            }

            ResolutionState::WebsiteResolved { website } => {
                ResolutionState::DirectoryLookup { website }
            }

            ResolutionState::DirectoryLookup { website } => {
                let outcome = self.directory.lookup(&website).await;
                if outcome.emails.is_empty() {
                    return ResolutionState::ScrapeFallback { website };
                }
                self.found(company, website, ResolutionSource::Directory, outcome.emails, None)
            }

            ResolutionState::ScrapeFallback { website } => {
                let report = self.scraper.crawl(&website).await;
                let career_page_url = report.career_page_url.clone();
                match report.outcome() {
                    ScrapeOutcome::Emails(emails) => {
                        let set = EmailSet::from_addresses(emails, EmailSource::Scrape);
                        self.found(company, website, ResolutionSource::Scrape, set, career_page_url)
                    }
                    ScrapeOutcome::FormOnly => ResolutionState::Done(ResolutionResult::not_found(
                        company.id,
                        website,
                        ResolutionSource::Scrape,
                        career_page_url,
                        Some(FORM_AVAILABLE.to_string()),
                    )),
                    ScrapeOutcome::NeedsAi { text } => ResolutionState::AiFallback {
                        website,
                        text,
                        career_page_url,
                    },
                    ScrapeOutcome::Nothing => ResolutionState::Done(ResolutionResult::not_found(
                        company.id,
                        website,
                        ResolutionSource::None,
                        career_page_url,
                        None,
                    )),
                }
            }

            ResolutionState::AiFallback {
                website,
                text,
                career_page_url,
            } => {
                let domain = extract_domain(&website).unwrap_or_default();
                let extraction = self
                    .extractor
                    .extract_from_text(&text, &company.name, &domain)
                    .await;
                let career_page_url = career_page_url.or(extraction.career_page_url);

                if extraction.emails.is_empty() {
                    return ResolutionState::Done(ResolutionResult::not_found(
                        company.id,
                        website,
                        ResolutionSource::None,
                        career_page_url,
                        None,
                    ));
                }
                let set = EmailSet::from_addresses(extraction.emails, EmailSource::AiFallback);
                self.found(company, website, ResolutionSource::AiFallback, set, career_page_url)
            }

            done @ ResolutionState::Done(_) => done,
        }
    }

    fn found(
        &self,
        company: &CompanyIdentity,
        website: String,
        source: ResolutionSource,
        emails: EmailSet,
        career_page_url: Option<String>,
    ) -> ResolutionState {
        let selected = self.prioritizer.select_best(&emails.addresses(), &company.name);
        ResolutionState::Done(ResolutionResult::found(
            company.id,
            website,
            source,
            emails,
            selected,
            career_page_url,
        ))
    }

    /// Resolve up to `max_companies` of `caller`'s pending companies, one at a time.
    ///
    /// Fails only before the first company: bad size, rate limit, or pending query failure.
    /// Per-company problems end up in that company's result.
    pub async fn run_batch(
        &self,
        caller: &str,
        max_companies: usize,
    ) -> Result<BatchReport, ProspectError> {
        if caller.trim().is_empty() {
            return Err(ProspectError::Unauthorized("missing caller identity".to_string()));
        }
        let max_companies = validate_batch_size(max_companies as i64)?;

        self.rate_limiter
            .check_and_consume(caller, RESOLVE_ACTION, self.settings.rate_limit_per_hour)
            .await?;

        let companies = self.store.pending_companies(caller, max_companies).await?;
        info!(caller, count = companies.len(), "Starting contact resolution batch");

        let mut results = Vec::with_capacity(companies.len());
        for (i, company) in companies.iter().enumerate() {
            if i > 0 && !self.settings.company_delay.is_zero() {
                tokio::time::sleep(self.settings.company_delay).await;
            }

            let resolution = self.resolve_company(company).await;
            info!(
                company_id = %company.id,
                company = company.name.as_str(),
                source = ?resolution.result.source,
                confidence = %resolution.result.confidence,
                selected = ?resolution.result.selected_email,
                path = ?resolution.path,
                "Company resolved"
            );

            if let Err(e) = self.store.save_resolution(company, &resolution.result).await {
                warn!(company_id = %company.id, error = %e, "Failed to persist resolution");
            }
            results.push(resolution.result);
        }

        // Unknown remainder reads as "more": the caller just invokes again.
        let has_more = match self.store.count_unresolved(caller).await {
            Ok(remaining) => remaining > 0,
            Err(e) => {
                warn!(caller, error = %e, "Failed to count unresolved companies");
                true
            }
        };
        let report = BatchReport::new(results, has_more);
        info!(caller, summary = %report.summary, "Contact resolution batch complete");
        Ok(report)
    }
}

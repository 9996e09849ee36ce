//! Company identity -> official website, via search plus AI disambiguation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use prospect_common::{extract_domain, CompanyIdentity, WebsiteCandidate};

use crate::traits::{LanguageModel, WebSearch};

/// Organic results requested per company.
pub const SEARCH_RESULTS: usize = 5;

/// Candidates kept after the blacklist.
pub const MAX_CANDIDATES: usize = 3;

/// Directory, registry, social and job-board hosts. Never a company's own site.
pub const BLACKLISTED_DOMAINS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "youtube.com",
    "tiktok.com",
    "wikipedia.org",
    "societe.com",
    "pappers.fr",
    "infogreffe.fr",
    "verif.com",
    "manageo.fr",
    "societe.ninja",
    "infonet.fr",
    "corporama.com",
    "kompass.com",
    "annuaire-entreprises.data.gouv.fr",
    "pagesjaunes.fr",
    "indeed.com",
    "indeed.fr",
    "glassdoor.com",
    "glassdoor.fr",
    "welcometothejungle.com",
    "hellowork.com",
    "google.com",
];

const NONE_TOKENS: &[&str] = &["NONE", "AUCUN", "AUCUNE"];

const DISAMBIGUATION_SYSTEM_PROMPT: &str = "\
You identify the official website of a French company among search results.
Answer with ONLY the number of the matching result (for example: 2).
If none of the results is the company's own website, answer exactly: NONE.
Never answer with anything else: no URL, no explanation, no punctuation.";

/// Outcome of parsing the disambiguation answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based candidate index.
    Index(usize),
    /// The model rejected every candidate.
    Nothing,
    Malformed,
}

/// Parse a 1-based index or the "none" token. Anything else, including an
/// out-of-range number, is `Malformed`.
pub fn parse_choice(answer: &str, candidate_count: usize) -> Choice {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c == '.' || c == '"' || c == '\'' || c == '`')
        .trim();

    if NONE_TOKENS.iter().any(|t| cleaned.eq_ignore_ascii_case(t)) {
        return Choice::Nothing;
    }

    match cleaned.parse::<usize>() {
        Ok(n) if (1..=candidate_count).contains(&n) => Choice::Index(n - 1),
        _ => Choice::Malformed,
    }
}

pub fn build_query(company: &CompanyIdentity) -> String {
    match company.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(city) => format!("{} {} site officiel", company.name.trim(), city),
        None => format!("{} site officiel", company.name.trim()),
    }
}

pub fn is_blacklisted(url: &str) -> bool {
    let Some(domain) = extract_domain(url) else {
        return true;
    };
    BLACKLISTED_DOMAINS
        .iter()
        .any(|b| domain == *b || domain.ends_with(&format!(".{b}")))
}

/// Drop blacklisted hosts, keep the first `MAX_CANDIDATES` in search order.
pub fn filter_candidates(results: Vec<WebsiteCandidate>) -> Vec<WebsiteCandidate> {
    results
        .into_iter()
        .filter(|c| !is_blacklisted(&c.url))
        .take(MAX_CANDIDATES)
        .collect()
}

fn disambiguation_prompt(company: &CompanyIdentity, candidates: &[WebsiteCandidate]) -> String {
    let mut prompt = format!("Company: {}\n", company.name);
    if let Some(city) = &company.city {
        prompt.push_str(&format!("City: {city}\n"));
    }
    prompt.push_str(&format!("SIREN: {}\n", company.registry_id));
    if let Some(label) = &company.activity_label {
        prompt.push_str(&format!("Activity: {label}\n"));
    }
    prompt.push_str("\nSearch results:\n");
    for (i, c) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {}\n   Title: {}\n   Snippet: {}\n",
            i + 1,
            c.url,
            c.title,
            c.snippet
        ));
    }
    prompt.push_str("\nWhich result is the official website? Answer with the number or NONE.");
    prompt
}

pub struct WebsiteResolver {
    search: Option<Arc<dyn WebSearch>>,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl WebsiteResolver {
    pub fn new(search: Option<Arc<dyn WebSearch>>, llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { search, llm }
    }

    /// The company's official website, or `None`. Never fails: search errors
    /// are logged and read as "no website".
    pub async fn resolve(&self, company: &CompanyIdentity) -> Option<String> {
        let Some(search) = &self.search else {
            warn!(company_id = %company.id, "No search client configured, website unresolved");
            return None;
        };

        let query = build_query(company);
        let results = match search.search(&query, SEARCH_RESULTS).await {
            Ok(r) => r,
            Err(e) => {
                warn!(company_id = %company.id, query = query.as_str(), error = %e, "Website search failed");
                return None;
            }
        };

        let mut candidates = filter_candidates(results);
        debug!(company_id = %company.id, count = candidates.len(), "Website candidates after blacklist");

        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(|c| c.url),
            _ => self.disambiguate(company, candidates).await,
        }
    }

    async fn disambiguate(
        &self,
        company: &CompanyIdentity,
        candidates: Vec<WebsiteCandidate>,
    ) -> Option<String> {
        let Some(llm) = &self.llm else {
            debug!(company_id = %company.id, "No language model, taking first candidate");
            return candidates.into_iter().next().map(|c| c.url);
        };

        let prompt = disambiguation_prompt(company, &candidates);
        let choice = match llm.complete(DISAMBIGUATION_SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => parse_choice(&answer, candidates.len()),
            Err(e) => {
                warn!(company_id = %company.id, error = %e, "Disambiguation call failed");
                Choice::Malformed
            }
        };

        match choice {
            Choice::Index(i) => {
                let url = candidates.into_iter().nth(i).map(|c| c.url);
                info!(company_id = %company.id, choice = i + 1, website = ?url, "Website disambiguated");
                url
            }
            Choice::Nothing => {
                info!(company_id = %company.id, "Model rejected every website candidate");
                None
            }
            Choice::Malformed => {
                debug!(company_id = %company.id, "Unusable disambiguation answer, taking first candidate");
                candidates.into_iter().next().map(|c| c.url)
            }
        }
    }
}

//! Bounded crawl of a handful of likely contact pages.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use prospect_common::site_root;

use crate::traits::PageFetcher;

/// Visited in order; the crawl stops at the first page yielding an email.
pub const CANDIDATE_PATHS: &[&str] = &["/", "/contact", "/recrutement", "/careers"];

/// Recruiting vocabulary, French then English. One entry per concept: inflections
/// of the same word share a pattern so a single mention counts once.
const CAREER_TERMS: &[&str] = &[
    r"recrut\w*",
    r"offres? d['’]emploi",
    r"candidatures?",
    r"postul\w*",
    r"carri[eè]res?",
    r"rejoignez-nous|rejoindre",
    r"careers?",
    r"jobs?",
    r"hiring",
    r"apply",
    r"vacanc(?:y|ies)",
    r"join our team",
];

static CAREER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CAREER_TERMS
        .iter()
        .map(|t| Regex::new(&format!(r"(?i)\b(?:{t})\b")).expect("valid regex"))
        .collect()
});

/// Distinct terms that must co-occur before a page counts as a careers page.
const CAREER_TERM_THRESHOLD: usize = 2;

pub fn is_career_page(text: &str) -> bool {
    CAREER_PATTERNS.iter().filter(|re| re.is_match(text)).count() >= CAREER_TERM_THRESHOLD
}

/// What the crawl gathered across every visited page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub emails: Vec<String>,
    /// Page texts joined in visit order; input of the AI fallback.
    pub text: String,
    pub career_page_url: Option<String>,
    pub has_contact_form: bool,
    pub pages_visited: usize,
}

/// Which way the cascade goes after the crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Emails(Vec<String>),
    /// No email, but a contact form exists.
    FormOnly,
    /// No email, no form, but text to hand to the extractor.
    NeedsAi { text: String },
    Nothing,
}

impl CrawlReport {
    pub fn outcome(&self) -> ScrapeOutcome {
        if !self.emails.is_empty() {
            ScrapeOutcome::Emails(self.emails.clone())
        } else if self.has_contact_form {
            ScrapeOutcome::FormOnly
        } else if !self.text.trim().is_empty() {
            ScrapeOutcome::NeedsAi {
                text: self.text.clone(),
            }
        } else {
            ScrapeOutcome::Nothing
        }
    }
}

pub struct ScrapeFallback {
    fetcher: Arc<dyn PageFetcher>,
    page_delay: Duration,
}

impl ScrapeFallback {
    pub fn new(fetcher: Arc<dyn PageFetcher>, page_delay: Duration) -> Self {
        Self {
            fetcher,
            page_delay,
        }
    }

    /// Absolute URLs of the candidate pages for `website`.
    pub fn candidate_urls(website: &str) -> Vec<String> {
        let Some(root) = site_root(website) else {
            return Vec::new();
        };
        CANDIDATE_PATHS
            .iter()
            .filter_map(|p| root.join(p).ok())
            .map(|u| u.to_string())
            .collect()
    }

    pub async fn crawl(&self, website: &str) -> CrawlReport {
        let mut report = CrawlReport::default();
        let urls = Self::candidate_urls(website);
        if urls.is_empty() {
            debug!(website, "Website is not a crawlable http(s) URL");
            return report;
        }

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let page = self.fetcher.fetch(url).await;
            report.pages_visited += 1;

            if report.career_page_url.is_none() && is_career_page(&page.text) {
                debug!(url = url.as_str(), "Careers page detected");
                report.career_page_url = Some(url.clone());
            }
            report.has_contact_form |= page.has_contact_form;
            if !page.text.is_empty() {
                if !report.text.is_empty() {
                    report.text.push('\n');
                }
                report.text.push_str(&page.text);
            }
            for email in page.emails {
                if !report.emails.contains(&email) {
                    report.emails.push(email);
                }
            }

            if !report.emails.is_empty() {
                break;
            }
        }

        info!(
            website,
            pages = report.pages_visited,
            emails = report.emails.len(),
            has_contact_form = report.has_contact_form,
            career_page = report.career_page_url.is_some(),
            "Scrape complete"
        );
        report
    }
}

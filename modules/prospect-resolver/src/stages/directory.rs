//! Domain directory lookup: organizational mailboxes known for a website's domain.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{debug, info, warn};

use prospect_common::{
    extract_domain, normalize_email, Confidence, EmailCandidate, EmailSet, EmailSource,
};

use crate::stages::prioritizer::keyword_rank;
use crate::traits::{DirectoryEmail, EmailDirectory};

/// Department priority, most useful for recruiting outreach first.
pub const DEPARTMENT_PRIORITY: &[&str] = &[
    "hr",
    "management",
    "executive",
    "sales",
    "support",
    "communication",
];

fn department_rank(department: Option<&str>) -> usize {
    department
        .map(str::to_lowercase)
        .and_then(|d| DEPARTMENT_PRIORITY.iter().position(|p| *p == d))
        .unwrap_or(DEPARTMENT_PRIORITY.len())
}

/// Order: local-part keyword hit, then department, then provider confidence descending.
/// Stable, so equal keys keep the provider's order.
pub fn rank_directory_emails(mut entries: Vec<DirectoryEmail>, keywords: &[String]) -> Vec<DirectoryEmail> {
    entries.sort_by_key(|e| {
        (
            keyword_rank(&e.address, keywords).unwrap_or(keywords.len()),
            department_rank(e.department.as_deref()),
            Reverse(e.confidence),
        )
    });
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOutcome {
    pub emails: EmailSet,
    pub confidence: Confidence,
}

impl DirectoryOutcome {
    pub fn empty() -> Self {
        Self {
            emails: EmailSet::new(),
            confidence: Confidence::None,
        }
    }
}

pub struct DirectoryLookup {
    directory: Option<Arc<dyn EmailDirectory>>,
    keywords: Vec<String>,
}

impl DirectoryLookup {
    pub fn new(directory: Option<Arc<dyn EmailDirectory>>, keywords: Vec<String>) -> Self {
        Self {
            directory,
            keywords,
        }
    }

    /// Ranked directory mailboxes for `website`'s domain. Missing client, bad URL
    /// and provider errors all yield an empty outcome.
    pub async fn lookup(&self, website: &str) -> DirectoryOutcome {
        let Some(directory) = &self.directory else {
            debug!(website, "No directory client configured, skipping lookup");
            return DirectoryOutcome::empty();
        };
        let Some(domain) = extract_domain(website) else {
            warn!(website, "Could not extract domain for directory lookup");
            return DirectoryOutcome::empty();
        };

        let entries = match directory.domain_emails(&domain).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(domain = domain.as_str(), error = %e, "Directory lookup failed");
                return DirectoryOutcome::empty();
            }
        };

        let mut emails = EmailSet::new();
        for entry in rank_directory_emails(entries, &self.keywords) {
            let address = normalize_email(&entry.address);
            if !prospect_common::is_valid_email(&address) || prospect_common::is_blocked_email(&address) {
                continue;
            }
            emails.insert(
                EmailCandidate::new(address, EmailSource::Directory).with_role(entry.department),
            );
        }

        info!(domain = domain.as_str(), count = emails.len(), "Directory lookup complete");
        let confidence = if emails.is_empty() {
            Confidence::None
        } else {
            Confidence::High
        };
        DirectoryOutcome { emails, confidence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDirectory;
    use prospect_common::config::DEFAULT_PRIORITY_KEYWORDS;

    fn keywords() -> Vec<String> {
        DEFAULT_PRIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect()
    }

    fn addresses(entries: &[DirectoryEmail]) -> Vec<&str> {
        entries.iter().map(|e| e.address.as_str()).collect()
    }

    #[test]
    fn keyword_beats_department() {
        let ranked = rank_directory_emails(
            vec![
                DirectoryEmail::new("direction@acme.fr", 99, Some("hr")),
                DirectoryEmail::new("recrutement@acme.fr", 40, Some("sales")),
            ],
            &keywords(),
        );
        assert_eq!(addresses(&ranked), vec!["recrutement@acme.fr", "direction@acme.fr"]);
    }

    #[test]
    fn hr_and_english_recruiting_mailboxes_rank_first() {
        let ranked = rank_directory_emails(
            vec![
                DirectoryEmail::new("info@acme.fr", 95, None),
                DirectoryEmail::new("christophe@acme.fr", 90, None),
                DirectoryEmail::new("drh@acme.fr", 40, None),
                DirectoryEmail::new("recruitment@acme.fr", 30, None),
            ],
            &keywords(),
        );
        assert_eq!(
            addresses(&ranked),
            vec!["recruitment@acme.fr", "drh@acme.fr", "info@acme.fr", "christophe@acme.fr"]
        );
    }

    #[test]
    fn department_then_confidence() {
        let ranked = rank_directory_emails(
            vec![
                DirectoryEmail::new("ventes@acme.fr", 95, Some("sales")),
                DirectoryEmail::new("gerance@acme.fr", 50, Some("management")),
                DirectoryEmail::new("a@acme.fr", 10, None),
                DirectoryEmail::new("b@acme.fr", 80, None),
                DirectoryEmail::new("personnel@acme.fr", 30, Some("HR")),
            ],
            &keywords(),
        );
        assert_eq!(
            addresses(&ranked),
            vec![
                "personnel@acme.fr",
                "gerance@acme.fr",
                "ventes@acme.fr",
                "b@acme.fr",
                "a@acme.fr"
            ]
        );
    }

    #[tokio::test]
    async fn lookup_ranks_and_tags_high() {
        let directory = Arc::new(MockDirectory::new().on_domain(
            "acme.fr",
            vec![
                DirectoryEmail::new("info@acme.fr", 90, None),
                DirectoryEmail::new("Recrutement@Acme.fr", 70, Some("hr")),
            ],
        ));
        let lookup = DirectoryLookup::new(Some(directory.clone()), keywords());

        let outcome = lookup.lookup("https://www.acme.fr/").await;
        assert_eq!(outcome.confidence, Confidence::High);
        assert_eq!(outcome.emails.addresses(), vec!["recrutement@acme.fr", "info@acme.fr"]);
        assert_eq!(directory.queried_domains(), vec!["acme.fr"]);

        let first = outcome.emails.into_vec().remove(0);
        assert_eq!(first.source, EmailSource::Directory);
        assert_eq!(first.organizational_role.as_deref(), Some("hr"));
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let failing = Arc::new(MockDirectory::new().fail_on("acme.fr"));
        let lookup = DirectoryLookup::new(Some(failing), keywords());
        assert_eq!(lookup.lookup("https://acme.fr").await, DirectoryOutcome::empty());

        let lookup = DirectoryLookup::new(None, keywords());
        assert_eq!(lookup.lookup("https://acme.fr").await, DirectoryOutcome::empty());

        let unknown = Arc::new(MockDirectory::new());
        let lookup = DirectoryLookup::new(Some(unknown), keywords());
        assert_eq!(lookup.lookup("https://acme.fr").await, DirectoryOutcome::empty());
    }

    #[tokio::test]
    async fn drops_blocked_addresses() {
        let directory = Arc::new(MockDirectory::new().on_domain(
            "acme.fr",
            vec![DirectoryEmail::new("noreply@acme.fr", 99, None)],
        ));
        let lookup = DirectoryLookup::new(Some(directory), keywords());
        let outcome = lookup.lookup("acme.fr").await;
        assert!(outcome.emails.is_empty());
        assert_eq!(outcome.confidence, Confidence::None);
    }
}

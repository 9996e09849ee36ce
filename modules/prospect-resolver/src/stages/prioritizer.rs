//! Deterministic choice of the single outreach address among candidates.

use prospect_common::local_part;

/// Company-name tokens shorter than this never count as a match.
const MIN_NAME_TOKEN: usize = 4;

/// Words too common in French company names to identify anyone.
const NAME_STOPWORDS: &[&str] = &[
    "societe", "groupe", "france", "entreprise", "compagnie", "company", "holding", "services",
];

/// First-name fragments that contain a keyword by accident (`hr` in `christophe`).
/// Masked out of the local part before matching.
const NAME_FRAGMENTS: &[&str] = &["chr"];

/// Whether the local part contains `keyword`, ignoring hits inside `NAME_FRAGMENTS`.
pub fn keyword_matches(local: &str, keyword: &str) -> bool {
    if keyword.is_empty() || !local.contains(keyword) {
        return false;
    }
    NAME_FRAGMENTS
        .iter()
        .fold(local.to_string(), |masked, fragment| masked.replace(fragment, " "))
        .contains(keyword)
}

/// Position of the first keyword (in priority order) matching the address' local part.
pub fn keyword_rank(address: &str, keywords: &[String]) -> Option<usize> {
    let local = local_part(address);
    keywords.iter().position(|k| keyword_matches(&local, k))
}

/// Lowercase and strip French diacritics so `Société Générale` compares to ASCII mail.
fn fold_accents(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn name_tokens(company_name: &str) -> Vec<String> {
    fold_accents(company_name)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_NAME_TOKEN && !NAME_STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct EmailPrioritizer {
    keywords: Vec<String>,
}

impl EmailPrioritizer {
    pub fn new(keywords: Vec<String>) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Pick the best address: first keyword hit in keyword-priority order, then an
    /// address carrying a token of the company name, then the first candidate.
    pub fn select_best(&self, emails: &[String], company_name: &str) -> Option<String> {
        match emails {
            [] => return None,
            [only] => return Some(only.clone()),
            _ => {}
        }

        // min over (rank, index) == scan keywords in order, first candidate wins ties.
        let by_keyword = emails
            .iter()
            .enumerate()
            .filter_map(|(i, e)| keyword_rank(e, &self.keywords).map(|rank| (rank, i)))
            .min()
            .map(|(_, i)| emails[i].clone());
        if by_keyword.is_some() {
            return by_keyword;
        }

        let tokens = name_tokens(company_name);
        let by_name = emails.iter().find(|e| {
            let lower = e.to_lowercase();
            tokens.iter().any(|t| lower.contains(t.as_str()))
        });
        if let Some(email) = by_name {
            return Some(email.clone());
        }

        emails.first().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_common::config::DEFAULT_PRIORITY_KEYWORDS;

    fn prioritizer() -> EmailPrioritizer {
        EmailPrioritizer::new(DEFAULT_PRIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect())
    }

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_and_single() {
        let p = prioritizer();
        assert_eq!(p.select_best(&[], "Acme"), None);
        assert_eq!(
            p.select_best(&emails(&["jean@acme.fr"]), "Acme").as_deref(),
            Some("jean@acme.fr")
        );
    }

    #[test]
    fn recruiting_beats_generic_contact() {
        let p = prioritizer();
        let list = emails(&["info@acme.fr", "contact@acme.fr", "recrutement@acme.fr"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("recrutement@acme.fr"));
    }

    #[test]
    fn keyword_order_wins_over_candidate_order() {
        let p = prioritizer();
        let list = emails(&["info@acme.fr", "contact@acme.fr"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("contact@acme.fr"));
    }

    #[test]
    fn keywords_match_anywhere_in_local_part() {
        let p = prioritizer();
        let hr_mailboxes = [
            "drh@acme.fr",
            "servicerh@acme.fr",
            "service.rh@acme.fr",
            "recrutementrh@acme.fr",
        ];
        for hr in hr_mailboxes {
            let list = emails(&["info@acme.fr", hr]);
            assert_eq!(p.select_best(&list, "Acme").as_deref(), Some(hr));
        }
    }

    #[test]
    fn english_recruiting_mailboxes_match() {
        let p = prioritizer();
        let list = emails(&["info@acme.com", "recruitment@acme.com"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("recruitment@acme.com"));

        let list = emails(&["contact@acme.com", "recruiting@acme.com"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("recruiting@acme.com"));
    }

    #[test]
    fn first_names_do_not_match_short_keywords() {
        let p = prioritizer();
        let list = emails(&["christophe@acme.fr", "info@acme.fr"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("info@acme.fr"));
        assert!(keyword_matches("hr.christine", "hr"));
        assert!(!keyword_matches("christine", "hr"));
    }

    #[test]
    fn falls_back_to_company_name_token() {
        let p = prioritizer();
        let list = emails(&["jean@gmail.com", "direction@boulangerie-martin.fr"]);
        assert_eq!(
            p.select_best(&list, "Boulangerie Martin SARL").as_deref(),
            Some("direction@boulangerie-martin.fr")
        );
    }

    #[test]
    fn short_and_stopword_name_tokens_are_ignored() {
        let p = prioritizer();
        // "BTP" is too short, "Groupe" is a stopword.
        let list = emails(&["jean@gmail.com", "paul@btp-groupe.fr"]);
        assert_eq!(p.select_best(&list, "Groupe BTP").as_deref(), Some("jean@gmail.com"));
    }

    #[test]
    fn accents_are_folded_for_name_match() {
        let p = prioritizer();
        let list = emails(&["a@gmail.com", "direction@societe-generale-btp.fr"]);
        assert_eq!(
            p.select_best(&list, "Société Générale BTP").as_deref(),
            Some("direction@societe-generale-btp.fr")
        );
    }

    #[test]
    fn otherwise_first_candidate() {
        let p = prioritizer();
        let list = emails(&["paul@gmail.com", "marie@gmail.com"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("paul@gmail.com"));
    }

    #[test]
    fn selection_is_always_a_member() {
        let p = prioritizer();
        let cases = [
            emails(&["a@x.fr", "b@x.fr"]),
            emails(&["contact@x.fr", "jobs@x.fr", "zz@x.fr"]),
            emails(&["x@acme.fr"]),
        ];
        for list in cases {
            let selected = p.select_best(&list, "Acme").unwrap();
            assert!(list.contains(&selected));
        }
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let p = EmailPrioritizer::new(vec!["compta".to_string()]);
        let list = emails(&["recrutement@acme.fr", "compta@acme.fr"]);
        assert_eq!(p.select_best(&list, "Acme").as_deref(), Some("compta@acme.fr"));
    }
}

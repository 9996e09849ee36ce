//! Last-resort extraction of contact details from scraped page text by a language model.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use ai_client::util::{strip_code_blocks, truncate_to_char_boundary};
use prospect_common::{is_blocked_email, is_valid_email, local_part, normalize_email};

use crate::traits::LanguageModel;

/// Bytes of aggregated page text sent to the model.
pub const MAX_EXCERPT: usize = 8_000;

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You extract contact details of a company from the text of its website.
Rules:
- Return ONLY email addresses that appear in the supplied text. Never invent or guess an address.
- De-obfuscate patterns such as \"name [at] domain [dot] com\" or \"name (at) domain.com\".
- Exclude noreply / no-reply style mailboxes.
- List recruiting, HR, contact or info mailboxes first.
- career_page is the URL or path of the recruiting page if the text mentions one, else null.
Respond with JSON only, no prose, in exactly this shape:
{\"emails_found\": [\"...\"], \"career_page\": null}";

/// The JSON shape the model is instructed to answer with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub emails_found: Vec<String>,
    #[serde(default)]
    pub career_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedExtraction {
    Parsed(ExtractionResponse),
    Malformed(String),
}

/// Decode a model answer, tolerating a Markdown code fence around the JSON.
pub fn parse_extraction(raw: &str) -> ParsedExtraction {
    match serde_json::from_str::<ExtractionResponse>(strip_code_blocks(raw)) {
        Ok(parsed) => ParsedExtraction::Parsed(parsed),
        Err(e) => ParsedExtraction::Malformed(e.to_string()),
    }
}

/// Keep addresses that are valid, not blocked, and whose local part occurs in `text`.
pub fn grounded_emails(candidates: &[String], text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut kept: Vec<String> = Vec::new();
    for candidate in candidates {
        let address = normalize_email(candidate);
        if !is_valid_email(&address) || is_blocked_email(&address) {
            continue;
        }
        if !haystack.contains(&local_part(&address)) {
            debug!(address = address.as_str(), "Dropping AI email not grounded in page text");
            continue;
        }
        if !kept.contains(&address) {
            kept.push(address);
        }
    }
    kept
}

/// Absolute careers URL from the model's answer: full http(s) URLs pass through,
/// site-relative paths are anchored on `domain`, anything else is dropped.
pub fn normalize_career_page(raw: Option<&str>, domain: &str) -> Option<String> {
    let raw = raw?.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return url::Url::parse(raw).ok().map(|u| u.to_string());
    }
    if raw.starts_with('/') && !domain.is_empty() {
        return url::Url::parse(&format!("https://{domain}"))
            .ok()?
            .join(raw)
            .ok()
            .map(|u| u.to_string());
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiExtraction {
    pub emails: Vec<String>,
    pub career_page_url: Option<String>,
}

pub struct ContentExtractor {
    llm: Option<Arc<dyn LanguageModel>>,
}

impl ContentExtractor {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { llm }
    }

    /// Never fails: missing model, call errors and unparseable answers give an empty extraction.
    pub async fn extract_from_text(&self, text: &str, company_name: &str, domain: &str) -> AiExtraction {
        let Some(llm) = &self.llm else {
            debug!(domain, "No language model configured, skipping AI extraction");
            return AiExtraction::default();
        };
        let excerpt = truncate_to_char_boundary(text, MAX_EXCERPT);
        if excerpt.trim().is_empty() {
            return AiExtraction::default();
        }

        let user = format!(
            "Company: {company_name}\nDomain: {domain}\n\nWebsite text:\n\"\"\"\n{excerpt}\n\"\"\""
        );
        let raw = match llm.complete(EXTRACTION_SYSTEM_PROMPT, &user).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(domain, error = %e, "AI extraction call failed");
                return AiExtraction::default();
            }
        };

        let response = match parse_extraction(&raw) {
            ParsedExtraction::Parsed(r) => r,
            ParsedExtraction::Malformed(reason) => {
                warn!(domain, reason = reason.as_str(), "Malformed AI extraction response");
                return AiExtraction::default();
            }
        };

        let extraction = AiExtraction {
            emails: grounded_emails(&response.emails_found, excerpt),
            career_page_url: normalize_career_page(response.career_page.as_deref(), domain),
        };
        info!(
            domain,
            returned = response.emails_found.len(),
            kept = extraction.emails.len(),
            "AI extraction complete"
        );
        extraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = r#"{"emails_found": ["rh@acme.fr"], "career_page": null}"#;
        assert_eq!(
            parse_extraction(plain),
            ParsedExtraction::Parsed(ExtractionResponse {
                emails_found: vec!["rh@acme.fr".into()],
                career_page: None,
            })
        );

        let fenced = "```json\n{\"emails_found\": [], \"career_page\": \"/jobs\"}\n```";
        assert_eq!(
            parse_extraction(fenced),
            ParsedExtraction::Parsed(ExtractionResponse {
                emails_found: vec![],
                career_page: Some("/jobs".into()),
            })
        );
    }

    #[test]
    fn missing_fields_default() {
        assert_eq!(
            parse_extraction("{}"),
            ParsedExtraction::Parsed(ExtractionResponse::default())
        );
    }

    #[test]
    fn prose_is_malformed() {
        assert!(matches!(
            parse_extraction("I found rh@acme.fr on the page."),
            ParsedExtraction::Malformed(_)
        ));
    }

    #[test]
    fn grounding_rejects_invented_addresses() {
        let text = "Écrivez à recrutement [at] acme [dot] fr pour postuler.";
        let kept = grounded_emails(
            &[
                "Recrutement@acme.fr".into(),
                "direction@acme.fr".into(),
                "noreply@acme.fr".into(),
                "not an email".into(),
                "recrutement@acme.fr".into(),
            ],
            text,
        );
        assert_eq!(kept, vec!["recrutement@acme.fr"]);
    }

    #[test]
    fn career_page_normalization() {
        assert_eq!(
            normalize_career_page(Some("/nous-rejoindre"), "acme.fr").as_deref(),
            Some("https://acme.fr/nous-rejoindre")
        );
        assert_eq!(
            normalize_career_page(Some("https://jobs.acme.fr/"), "acme.fr").as_deref(),
            Some("https://jobs.acme.fr/")
        );
        assert_eq!(normalize_career_page(Some("la page carrières"), "acme.fr"), None);
        assert_eq!(normalize_career_page(None, "acme.fr"), None);
    }

    #[tokio::test]
    async fn extracts_grounded_emails() {
        let llm = Arc::new(MockLanguageModel::new().respond(
            r#"{"emails_found": ["contact@acme.fr", "ceo@acme.fr"], "career_page": "/careers"}"#,
        ));
        let extractor = ContentExtractor::new(Some(llm.clone()));

        let result = extractor
            .extract_from_text("Pour nous joindre : contact (at) acme.fr", "Acme Corp", "acme.fr")
            .await;
        assert_eq!(result.emails, vec!["contact@acme.fr"]);
        assert_eq!(result.career_page_url.as_deref(), Some("https://acme.fr/careers"));

        let (system, user) = llm.prompts().remove(0);
        assert!(system.contains("Never invent"));
        assert!(user.contains("Company: Acme Corp"));
        assert!(user.contains("contact (at) acme.fr"));
    }

    #[tokio::test]
    async fn failures_yield_empty_extraction() {
        let extractor = ContentExtractor::new(Some(Arc::new(MockLanguageModel::new().respond("sorry"))));
        assert_eq!(
            extractor.extract_from_text("texte", "Acme", "acme.fr").await,
            AiExtraction::default()
        );

        let extractor = ContentExtractor::new(Some(Arc::new(MockLanguageModel::new().fail("timeout"))));
        assert_eq!(
            extractor.extract_from_text("texte", "Acme", "acme.fr").await,
            AiExtraction::default()
        );

        let extractor = ContentExtractor::new(None);
        assert_eq!(
            extractor.extract_from_text("texte", "Acme", "acme.fr").await,
            AiExtraction::default()
        );
    }

    #[tokio::test]
    async fn long_text_is_truncated_before_sending() {
        let llm = Arc::new(MockLanguageModel::new().respond(r#"{"emails_found": []}"#));
        let extractor = ContentExtractor::new(Some(llm.clone()));
        let text = "é".repeat(MAX_EXCERPT);

        extractor.extract_from_text(&text, "Acme", "acme.fr").await;
        let (_, user) = llm.prompts().remove(0);
        assert!(user.len() < MAX_EXCERPT + 200);
    }
}

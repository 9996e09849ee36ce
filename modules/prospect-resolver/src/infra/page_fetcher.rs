// Single-page HTTP fetch + content extraction.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};

use ai_client::util::truncate_to_char_boundary;
use prospect_common::{is_blocked_email, is_valid_email, normalize_email, EMAIL_RE};

use crate::traits::{FetchedPage, PageFetcher};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Cap on cleaned text kept per page; bounds what reaches the language model.
pub const MAX_PAGE_TEXT: usize = 5_000;

/// Bytes of response body read per page; the rest is dropped unread.
pub const MAX_HTML_BYTES: usize = 2 * 1024 * 1024;

/// Elements whose text is navigation chrome or code, never page content.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "iframe", "noscript",
];

static MAILTO_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="mailto:"], a[href^="MAILTO:"]"#).expect("valid selector"));
static FORM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form").expect("valid selector"));

pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_body: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build page fetcher HTTP client")?;

        info!(timeout_ms = timeout.as_millis() as u64, "HttpPageFetcher initialized");
        Ok(Self {
            client,
            max_body: MAX_HTML_BYTES,
        })
    }

    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    /// Body of a 2xx response, cut at `max_body` bytes; `None` for any other status.
    async fn fetch_html(&self, url: &str) -> Result<Option<String>> {
        let mut resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "Non-success status, skipping page");
            return Ok(None);
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let room = self.max_body - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url, max_bytes = self.max_body, "Page body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Some(String::from_utf8_lossy(&body).into_owned()))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> FetchedPage {
        match self.fetch_html(url).await {
            Ok(Some(html)) => {
                let page = parse_page(url, &html);
                debug!(
                    url,
                    bytes = html.len(),
                    emails = page.emails.len(),
                    has_contact_form = page.has_contact_form,
                    "Fetched page"
                );
                page
            }
            Ok(None) => FetchedPage::empty(url),
            Err(e) => {
                debug!(url, error = %e, "Page fetch failed");
                FetchedPage::empty(url)
            }
        }
    }
}

/// Extract text, emails and the contact-form flag from raw HTML.
pub fn parse_page(url: &str, html: &str) -> FetchedPage {
    let document = Html::parse_document(html);

    let mut raw_text = String::new();
    collect_text(document.root_element(), &mut raw_text);
    let full_text = collapse_whitespace(&raw_text);

    let has_contact_form =
        document.select(&FORM_SELECTOR).next().is_some() && mentions_contact(&full_text);

    let mut candidates: Vec<String> = EMAIL_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect();
    candidates.extend(mailto_targets(&document));

    FetchedPage {
        url: url.to_string(),
        emails: clean_emails(candidates),
        text: truncate_to_char_boundary(&full_text, MAX_PAGE_TEXT).to_string(),
        has_contact_form,
    }
}

/// Depth-first text collection that skips stripped subtrees.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if !STRIPPED_TAGS.contains(&el.name()) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A `<form>` only counts as a contact form when the page talks about contact.
fn mentions_contact(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("contact") || lower.contains("message")
}

fn mailto_targets(document: &Html) -> Vec<String> {
    document
        .select(&MAILTO_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .flat_map(|href| {
            let target = &href["mailto:".len()..];
            let target = target.split('?').next().unwrap_or_default();
            target
                .split(',')
                .map(|s| s.trim().replace("%40", "@"))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Normalize, validate, drop blocked addresses, dedup in first-seen order.
pub fn clean_emails<I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| normalize_email(&c))
        .filter(|c| is_valid_email(c) && !is_blocked_email(c))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_content_markup() {
        let html = r#"<html><head><style>.a{color:red}</style><script>var x = 1;</script></head>
            <body><header>Menu Accueil</header><nav>Produits</nav>
            <main><h1>Acme Corp</h1><p>Nous fabriquons   des   fusées.</p></main>
            <footer>Mentions légales</footer><noscript>Activez JS</noscript></body></html>"#;
        let page = parse_page("https://acme.fr/", html);

        assert_eq!(page.text, "Acme Corp Nous fabriquons des fusées.");
    }

    #[test]
    fn extracts_visible_and_mailto_emails() {
        let html = r#"<body><p>Écrivez-nous : Contact@Acme.fr</p>
            <a href="mailto:rh@acme.fr?subject=Candidature">Recrutement</a>
            <a href="mailto:contact@acme.fr">Contact</a></body>"#;
        let page = parse_page("https://acme.fr/contact", html);

        assert_eq!(page.emails, vec!["contact@acme.fr", "rh@acme.fr"]);
    }

    #[test]
    fn emails_inside_stripped_tags_still_count() {
        // Extraction runs over raw HTML, not the cleaned text.
        let html = r#"<body><footer>info@acme.fr</footer></body>"#;
        let page = parse_page("https://acme.fr/", html);

        assert_eq!(page.emails, vec!["info@acme.fr"]);
        assert!(page.text.is_empty());
    }

    #[test]
    fn filters_noreply_placeholder_and_image_false_positives() {
        let html = r#"<body>
            <img src="/img/logo@2x.png"> <img src="hero@3x.jpeg">
            <p>noreply@acme.fr no-reply@acme.fr jean.dupont@example.com</p>
            <a href="mailto:NoReply@acme.fr">x</a>
            <p>bonjour@acme.fr</p></body>"#;
        let page = parse_page("https://acme.fr/", html);

        assert_eq!(page.emails, vec!["bonjour@acme.fr"]);
    }

    #[test]
    fn contact_form_requires_contact_wording() {
        let contact = r#"<body><h2>Contactez-nous</h2><form><input name="email"></form></body>"#;
        assert!(parse_page("u", contact).has_contact_form);

        let message = r#"<body><p>Laissez-nous un message</p><form></form></body>"#;
        assert!(parse_page("u", message).has_contact_form);

        let newsletter = r#"<body><p>Inscrivez-vous à la newsletter</p><form></form></body>"#;
        assert!(!parse_page("u", newsletter).has_contact_form);

        let no_form = r#"<body><p>Contact : 01 02 03 04 05</p></body>"#;
        assert!(!parse_page("u", no_form).has_contact_form);
    }

    #[test]
    fn text_is_capped() {
        let body = "mot ".repeat(5_000);
        let html = format!("<body><p>{body}</p></body>");
        let page = parse_page("u", &html);
        assert!(page.text.len() <= MAX_PAGE_TEXT);
        assert!(page.text.starts_with("mot mot"));
    }

    #[test]
    fn clean_emails_dedups_after_normalization() {
        let cleaned = clean_emails(vec![
            "Info@Acme.fr".to_string(),
            "info@acme.fr.".to_string(),
            "not-an-email".to_string(),
        ]);
        assert_eq!(cleaned, vec!["info@acme.fr"]);
    }

    #[tokio::test]
    async fn fetch_returns_empty_page_on_error_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<p>rh@acme.fr</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/contact", server.uri());
        let page = fetcher.fetch(&url).await;

        assert_eq!(page, FetchedPage::empty(&url));
    }

    #[tokio::test]
    async fn fetch_sends_french_accept_language() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, Request, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(|req: &Request| {
                req.headers
                    .get("accept-language")
                    .is_some_and(|v| v.as_bytes().starts_with(b"fr-FR"))
            })
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<body><p>Contact : contact@acme.fr</p></body>"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
        let page = fetcher.fetch(&format!("{}/", server.uri())).await;

        assert_eq!(page.emails, vec!["contact@acme.fr"]);
        assert_eq!(page.text, "Contact : contact@acme.fr");
    }

    #[tokio::test]
    async fn fetch_reads_at_most_max_body_bytes() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let head = "<body><p>contact@acme.fr</p>";
        let html = format!("{head}{}<p>tail@acme.fr</p></body>", " ".repeat(10_000));
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_max_body(1_000);
        let page = fetcher.fetch(&server.uri()).await;

        assert_eq!(page.emails, vec!["contact@acme.fr"]);
    }

    #[tokio::test]
    async fn fetch_times_out_to_empty_page() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late@acme.fr</p>")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_millis(100)).unwrap();
        let page = fetcher.fetch(&server.uri()).await;

        assert!(page.emails.is_empty());
    }
}

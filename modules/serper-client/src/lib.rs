pub mod error;

pub use error::{Result, SerperError};

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

const BASE_URL: &str = "https://google.serper.dev";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

/// One organic (non-ad) search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

pub struct SerperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    country: String,
    language: String,
}

impl SerperClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            country: "fr".to_string(),
            language: "fr".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Override the `gl`/`hl` locale pair (defaults to France/French).
    pub fn with_locale(mut self, country: &str, language: &str) -> Self {
        self.country = country.to_string();
        self.language = language.to_string();
        self
    }

    /// Run a web search and return up to `num` organic results.
    pub async fn search(&self, query: &str, num: usize) -> Result<Vec<OrganicResult>> {
        info!(query, num, "Serper search");

        let body = serde_json::json!({
            "q": query,
            "num": num,
            "gl": self.country,
            "hl": self.language,
        });

        let resp = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SerperError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: SearchResponse = resp.json().await?;
        let mut results = data.organic;
        results.truncate(num);

        info!(query, count = results.len(), "Serper search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_organic_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "serper-key"))
            .and(body_partial_json(serde_json::json!({
                "q": "Acme Corp Lyon site officiel",
                "num": 5,
                "gl": "fr",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [
                    { "link": "https://acme.fr/", "title": "Acme", "snippet": "Accueil", "position": 1 },
                    { "link": "https://www.linkedin.com/company/acme", "title": "Acme | LinkedIn" }
                ]
            })))
            .mount(&server)
            .await;

        let client = SerperClient::new("serper-key").with_base_url(&server.uri());
        let results = client.search("Acme Corp Lyon site officiel", 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].link, "https://acme.fr/");
        assert_eq!(results[1].snippet, "");
    }

    #[tokio::test]
    async fn missing_organic_block_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = SerperClient::new("k").with_base_url(&server.uri());
        assert!(client.search("nothing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = SerperClient::new("k").with_base_url(&server.uri());
        match client.search("acme", 5).await {
            Err(SerperError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}

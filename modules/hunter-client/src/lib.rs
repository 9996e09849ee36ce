pub mod error;
pub mod types;

pub use error::{HunterError, Result};
pub use types::{DomainEmail, DomainSearch, EmailType, EmailTypeFilter};

use std::time::Duration;

use tracing::info;
use types::ApiResponse;

const BASE_URL: &str = "https://api.hunter.io/v2";

pub struct HunterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HunterClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// List the mailboxes Hunter knows for `domain`.
    pub async fn domain_search(
        &self,
        domain: &str,
        filter: EmailTypeFilter,
        limit: u32,
    ) -> Result<DomainSearch> {
        info!(domain, limit, "Hunter domain search");

        let limit = limit.to_string();
        let mut query = vec![
            ("domain", domain),
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(kind) = filter.as_query() {
            query.push(("type", kind));
        }

        let resp = self
            .client
            .get(format!("{}/domain-search", self.base_url))
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HunterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_resp: ApiResponse<DomainSearch> = resp.json().await?;
        info!(domain, count = api_resp.data.emails.len(), "Hunter domain search complete");
        Ok(api_resp.data)
    }
}

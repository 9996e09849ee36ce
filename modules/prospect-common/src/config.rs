use std::env;
use std::time::Duration;

use tracing::info;

/// Built-in keyword priority for picking an outreach address, most useful first.
/// Recruiting terms (FR then EN) precede generic contact mailboxes.
pub const DEFAULT_PRIORITY_KEYWORDS: &[&str] = &[
    "recrutement",
    "recruitment",
    "recruiting",
    "drh",
    "rh",
    "hr",
    "jobs",
    "job",
    "emploi",
    "carriere",
    "careers",
    "career",
    "talent",
    "candidature",
    "contact",
    "info",
    "accueil",
    "hello",
    "bonjour",
];

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pause between two companies in a batch.
    pub company_delay: Duration,
    /// Pause between two scraped pages of the same site.
    pub page_delay: Duration,
    /// Hard timeout for a single page fetch.
    pub page_timeout: Duration,
    /// Resolution batches allowed per caller per hour.
    pub rate_limit_per_hour: u32,
    pub priority_keywords: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            company_delay: Duration::from_millis(1500),
            page_delay: Duration::from_millis(500),
            page_timeout: Duration::from_secs(5),
            rate_limit_per_hour: 20,
            priority_keywords: DEFAULT_PRIORITY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PipelineSettings {
    /// No pauses; for tests and local replays.
    pub fn immediate() -> Self {
        Self {
            company_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            company_delay: env_millis("COMPANY_DELAY_MS").unwrap_or(defaults.company_delay),
            page_delay: env_millis("PAGE_DELAY_MS").unwrap_or(defaults.page_delay),
            page_timeout: env::var("PAGE_TIMEOUT_SECS")
                .ok()
                .map(|v| {
                    v.parse()
                        .map(Duration::from_secs)
                        .expect("PAGE_TIMEOUT_SECS must be a number")
                })
                .unwrap_or(defaults.page_timeout),
            rate_limit_per_hour: env::var("RESOLVE_RATE_LIMIT_PER_HOUR")
                .ok()
                .map(|v| v.parse().expect("RESOLVE_RATE_LIMIT_PER_HOUR must be a number"))
                .unwrap_or(defaults.rate_limit_per_hour),
            priority_keywords: env::var("EMAIL_PRIORITY_KEYWORDS")
                .ok()
                .map(|v| parse_keywords(&v))
                .filter(|k| !k.is_empty())
                .unwrap_or(defaults.priority_keywords),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // External sources (empty = disabled)
    pub serper_api_key: String,
    pub hunter_api_key: String,
    pub openai_api_key: String,
    pub openai_model: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,

    pub pipeline: PipelineSettings,
}

impl Config {
    /// Configuration for the batch resolver CLI.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            serper_api_key: env::var("SERPER_API_KEY").unwrap_or_default(),
            hunter_api_key: env::var("HUNTER_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            jwt_secret: String::new(),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "prospect".to_string()),
            pipeline: PipelineSettings::from_env(),
        }
    }

    /// Configuration for the HTTP API, which additionally needs a JWT secret.
    pub fn api_from_env() -> Self {
        Self {
            jwt_secret: required_env("JWT_SECRET"),
            ..Self::from_env()
        }
    }

    /// Log which sources are enabled without printing any secret.
    pub fn log_redacted(&self) {
        info!(
            serper = is_set(&self.serper_api_key),
            hunter = is_set(&self.hunter_api_key),
            openai = is_set(&self.openai_api_key),
            openai_model = self.openai_model.as_str(),
            company_delay_ms = self.pipeline.company_delay.as_millis() as u64,
            page_delay_ms = self.pipeline.page_delay.as_millis() as u64,
            page_timeout_s = self.pipeline.page_timeout.as_secs(),
            rate_limit_per_hour = self.pipeline.rate_limit_per_hour,
            priority_keywords = self.pipeline.priority_keywords.len(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key).ok().map(|v| {
        v.parse()
            .map(Duration::from_millis)
            .unwrap_or_else(|_| panic!("{key} must be a number of milliseconds"))
    })
}

fn is_set(value: &str) -> &'static str {
    if value.is_empty() {
        "unset"
    } else {
        "set"
    }
}

/// Split a comma-separated keyword list, lowercased, blanks dropped.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keyword_overrides() {
        assert_eq!(
            parse_keywords(" Talent , ,jobs,CONTACT "),
            vec!["talent", "jobs", "contact"]
        );
        assert!(parse_keywords(" , ").is_empty());
    }

    #[test]
    fn default_keywords_put_recruiting_first() {
        let settings = PipelineSettings::default();
        let recrutement = settings.priority_keywords.iter().position(|k| k == "recrutement");
        let contact = settings.priority_keywords.iter().position(|k| k == "contact");
        assert!(recrutement.unwrap() < contact.unwrap());
    }

    #[test]
    fn immediate_settings_have_no_delays() {
        let settings = PipelineSettings::immediate();
        assert!(settings.company_delay.is_zero());
        assert!(settings.page_delay.is_zero());
        assert_eq!(settings.page_timeout, Duration::from_secs(5));
    }
}

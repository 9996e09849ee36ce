use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use prospect_common::{Config, PipelineSettings};

use crate::infra::HttpPageFetcher;
use crate::store::{PgCompanyStore, PgRateLimitLog};
use crate::traits::{
    CompanyStore, EmailDirectory, LanguageModel, PageFetcher, RateLimitLog, WebSearch,
};

/// Everything a `Pipeline` talks to. Optional sources degrade their stage to "no result".
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub store: Arc<dyn CompanyStore>,
    pub rate_log: Arc<dyn RateLimitLog>,
    pub fetcher: Arc<dyn PageFetcher>,
    #[builder(default)]
    pub search: Option<Arc<dyn WebSearch>>,
    #[builder(default)]
    pub directory: Option<Arc<dyn EmailDirectory>>,
    #[builder(default)]
    pub llm: Option<Arc<dyn LanguageModel>>,
    #[builder(default)]
    pub settings: PipelineSettings,
}

impl PipelineDeps {
    /// Production wiring: Postgres store and log, real HTTP clients for every configured key.
    pub fn from_config(config: &Config, pool: PgPool) -> Result<Self> {
        let search: Option<Arc<dyn WebSearch>> = (!config.serper_api_key.is_empty()).then(|| {
            Arc::new(serper_client::SerperClient::new(&config.serper_api_key)) as Arc<dyn WebSearch>
        });
        let directory: Option<Arc<dyn EmailDirectory>> =
            (!config.hunter_api_key.is_empty()).then(|| {
                Arc::new(hunter_client::HunterClient::new(&config.hunter_api_key))
                    as Arc<dyn EmailDirectory>
            });
        let llm: Option<Arc<dyn LanguageModel>> = (!config.openai_api_key.is_empty()).then(|| {
            Arc::new(ai_client::OpenAi::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            )) as Arc<dyn LanguageModel>
        });

        Ok(Self::builder()
            .store(Arc::new(PgCompanyStore::new(pool.clone())))
            .rate_log(Arc::new(PgRateLimitLog::new(pool)))
            .fetcher(Arc::new(HttpPageFetcher::new(config.pipeline.page_timeout)?))
            .search(search)
            .directory(directory)
            .llm(llm)
            .settings(config.pipeline.clone())
            .build())
    }
}

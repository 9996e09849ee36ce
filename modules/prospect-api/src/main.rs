use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prospect_api::jwt::JwtService;
use prospect_api::{router, AppState};
use prospect_common::Config;
use prospect_resolver::{store, Pipeline, PipelineDeps};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prospect=info".parse()?))
        .init();

    let config = Config::api_from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    store::migrate(&pool).await?;

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(PipelineDeps::from_config(&config, pool)?),
        jwt: JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()),
    });

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Prospect API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

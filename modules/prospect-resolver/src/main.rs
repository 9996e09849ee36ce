use anyhow::Result;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prospect_common::Config;
use prospect_resolver::pipeline::DEFAULT_BATCH;
use prospect_resolver::{store, Pipeline, PipelineDeps};

#[derive(Parser)]
#[command(name = "resolve", about = "Resolve websites and contact emails for pending companies")]
struct Cli {
    /// Owner whose companies are resolved; also the rate-limit identity.
    #[arg(long)]
    caller: String,

    /// Companies per batch (1-150).
    #[arg(long, default_value_t = DEFAULT_BATCH)]
    max_companies: usize,

    /// Keep running batches while companies remain.
    #[arg(long)]
    until_done: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("prospect=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    store::migrate(&pool).await?;

    let pipeline = Pipeline::new(PipelineDeps::from_config(&config, pool)?);

    let mut batches = 0usize;
    loop {
        let report = pipeline.run_batch(&cli.caller, cli.max_companies).await?;
        batches += 1;
        info!(batch = batches, summary = %report.summary, "{}", report.message);

        if !cli.until_done || !report.has_more || report.processed == 0 {
            break;
        }
    }

    Ok(())
}

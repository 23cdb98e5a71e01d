use std::sync::Arc;

use anyhow::Context;
use pipeline::{
    config::AppConfig,
    cycle::{CycleSnapshot, CycleStatus, Pipeline},
    db::Db,
    history::{HistoryStore, SqlxHistoryRepository},
    source::HttpFetcher,
};

/// Connects the ledger and runs migrations.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<HistoryStore> {
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await.context("history migration failed")?;

    let repo = Arc::new(SqlxHistoryRepository::new(db.pool.clone()));
    Ok(HistoryStore::new(repo))
}

async fn run_once(pipeline: &Pipeline, cfg: &AppConfig) -> anyhow::Result<CycleSnapshot> {
    match cfg.cycle_timeout {
        Some(deadline) => Ok(pipeline.run_cycle_with_timeout(deadline).await?),
        None => Ok(pipeline.run_cycle().await),
    }
}

/// Runs exactly one ingestion cycle. Scheduling belongs to the caller
/// (cron, systemd timer, …).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("invalid configuration")?;
    common::init_logger("pipeline", cfg.json_logs);

    tracing::info!(sources = cfg.sources.len(), "Starting price pipeline...");

    let store = init_store(&cfg).await?;
    let fetcher = Arc::new(HttpFetcher::new(cfg.http_timeout, &cfg.user_agent)?);

    let pipeline = Pipeline::from_config(&cfg, fetcher).with_store(store);

    let snapshot = run_once(&pipeline, &cfg).await?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if snapshot.status == CycleStatus::AllSourcesFailed {
        anyhow::bail!("all sources failed this cycle");
    }
    Ok(())
}

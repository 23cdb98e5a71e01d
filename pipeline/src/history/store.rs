use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use common::warn_if_slow;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::history::model::{HistoryRecord, UpsertSummary};
use crate::history::repository::HistoryRepository;

/// Cycle-facing ledger. Serialises writers; reads go straight to the
/// repository, which only ever exposes committed batches.
#[derive(Clone)]
pub struct HistoryStore {
    repo: Arc<dyn HistoryRepository>,
    write_gate: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self {
            repo,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn upsert(&self, record: HistoryRecord) -> Result<UpsertSummary> {
        self.upsert_batch(std::slice::from_ref(&record)).await
    }

    #[instrument(skip(self, records), target = "store", fields(records = records.len()))]
    pub async fn upsert_batch(&self, records: &[HistoryRecord]) -> Result<UpsertSummary> {
        for r in records {
            validate(r)?;
        }
        if records.is_empty() {
            debug!("empty batch; nothing to write");
            return Ok(UpsertSummary::default());
        }

        let _gate = self.write_gate.lock().await;

        let summary = warn_if_slow("history_upsert_batch", Duration::from_millis(200), async {
            self.repo.upsert_batch(records).await
        })
        .await
        .context("failed to upsert history batch")?;

        info!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            "history batch committed"
        );
        Ok(summary)
    }

    #[instrument(skip(self), target = "store")]
    pub async fn read_all(&self) -> Result<Vec<HistoryRecord>> {
        warn_if_slow("history_read_all", Duration::from_millis(200), async {
            self.repo.read_all().await
        })
        .await
        .context("failed to read history")
    }
}

fn validate(r: &HistoryRecord) -> Result<()> {
    if r.item.trim().is_empty() {
        bail!("history record on {} has an empty item", r.date);
    }
    if r.currency.len() != 3 || !r.currency.bytes().all(|b| b.is_ascii_uppercase()) {
        bail!("history record {} has invalid currency {:?}", r.item, r.currency);
    }
    Ok(())
}

use anyhow::Result;
use async_trait::async_trait;

use crate::history::model::{HistoryRecord, UpsertSummary};

/// Durable price ledger keyed by `(date, item)`.
///
/// A batch becomes visible to readers all at once or not at all.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn upsert_batch(&self, records: &[HistoryRecord]) -> Result<UpsertSummary>;

    /// Every record, in no particular order; callers sort by date.
    async fn read_all(&self) -> Result<Vec<HistoryRecord>>;
}

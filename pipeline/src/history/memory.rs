use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::history::model::{HistoryRecord, UpsertSummary};
use crate::history::repository::HistoryRepository;

type Ledger = BTreeMap<(NaiveDate, String), HistoryRecord>;

/// In-process ledger behind a copy-on-write snapshot pointer.
///
/// Readers clone the `Arc` and never observe a half-applied batch.
#[derive(Default)]
pub struct MemoryHistoryRepository {
    snapshot: RwLock<Arc<Ledger>>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn upsert_batch(&self, records: &[HistoryRecord]) -> anyhow::Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let mut guard = self.snapshot.write();

        let mut next: Ledger = (**guard).clone();
        for r in records {
            let (date, item) = r.key();
            match next.insert((date, item.to_string()), r.clone()) {
                Some(_) => summary.replaced += 1,
                None => summary.inserted += 1,
            }
        }

        *guard = Arc::new(next);
        Ok(summary)
    }

    async fn read_all(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        let snap = self.snapshot.read().clone();
        Ok(snap.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(day: u32, item: &str, price: rust_decimal::Decimal) -> HistoryRecord {
        HistoryRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            item: item.to_string(),
            price,
            currency: "TWD".to_string(),
            source: "LME".to_string(),
        }
    }

    #[tokio::test]
    async fn reader_snapshot_is_unaffected_by_later_batches() {
        let repo = MemoryHistoryRepository::new();
        repo.upsert_batch(&[rec(26, "CSP磷", dec!(100))]).await.unwrap();

        let before = repo.snapshot.read().clone();
        let s = repo
            .upsert_batch(&[rec(26, "CSP磷", dec!(105)), rec(26, "CSP紅", dec!(272))])
            .await
            .unwrap();
        assert_eq!(s, UpsertSummary { inserted: 1, replaced: 1 });

        assert_eq!(before.len(), 1);
        assert_eq!(repo.len(), 2);
        let all = repo.read_all().await.unwrap();
        assert!(all.iter().any(|r| r.item == "CSP磷" && r.price == dec!(105)));
    }
}

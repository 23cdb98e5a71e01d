use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{AnyPool, Row};

use crate::history::model::{HistoryRecord, UpsertSummary};
use crate::history::repository::HistoryRepository;

const DATE_FMT: &str = "%Y-%m-%d";

/// SQLx-backed ledger. Responsible only for persistence and row mapping.
pub struct SqlxHistoryRepository {
    pool: AnyPool,
}

impl SqlxHistoryRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqlxHistoryRepository {
    async fn upsert_batch(&self, records: &[HistoryRecord]) -> anyhow::Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await.context("begin history batch")?;

        for r in records {
            let date = r.date.format(DATE_FMT).to_string();

            let existing = sqlx::query("SELECT item FROM price_history WHERE date = ? AND item = ?;")
                .bind(&date)
                .bind(&r.item)
                .fetch_optional(&mut *tx)
                .await?;

            sqlx::query(
                r#"
INSERT INTO price_history (date, item, price, currency, source)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT(date, item) DO UPDATE SET
  price = excluded.price,
  currency = excluded.currency,
  source = excluded.source;
"#,
            )
            .bind(&date)
            .bind(&r.item)
            .bind(r.price.to_string())
            .bind(&r.currency)
            .bind(&r.source)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("upsert {} {}", date, r.item))?;

            if existing.is_some() {
                summary.replaced += 1;
            } else {
                summary.inserted += 1;
            }
        }

        tx.commit().await.context("commit history batch")?;
        Ok(summary)
    }

    async fn read_all(&self) -> anyhow::Result<Vec<HistoryRecord>> {
        let rows = sqlx::query("SELECT date, item, price, currency, source FROM price_history;")
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_record(&r) {
                Ok(rec) => out.push(rec),
                Err(e) => {
                    // poison-row resilience: skip but keep the rest readable
                    tracing::warn!(error = %e, "skipping malformed history row");
                }
            }
        }
        Ok(out)
    }
}

fn row_to_record(r: &sqlx::any::AnyRow) -> anyhow::Result<HistoryRecord> {
    let date: String = r.try_get("date")?;
    let price: String = r.try_get("price")?;

    Ok(HistoryRecord {
        date: NaiveDate::parse_from_str(&date, DATE_FMT)
            .with_context(|| format!("invalid date {date:?}"))?,
        item: r.try_get("item")?,
        price: Decimal::from_str(&price).with_context(|| format!("invalid price {price:?}"))?,
        currency: r.try_get("currency")?,
        source: r.try_get("source")?,
    })
}
